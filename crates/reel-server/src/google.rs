use anyhow::{bail, Context, Result};
use serde::Deserialize;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Subset of the claims Google's tokeninfo endpoint returns for an ID token.
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    pub aud: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Verify a Google ID token against the tokeninfo endpoint and check that
/// it was issued for our client id. Signature and expiry validation happen
/// on Google's side; a rejected token comes back as a non-2xx status.
pub async fn verify_google_id_token(
    http: &reqwest::Client,
    client_id: &str,
    id_token: &str,
) -> Result<GoogleProfile> {
    let response = http
        .get(TOKENINFO_URL)
        .query(&[("id_token", id_token)])
        .send()
        .await
        .context("Failed to reach Google tokeninfo")?;

    if !response.status().is_success() {
        bail!("Google rejected the id token: {}", response.status());
    }

    let profile: GoogleProfile = response
        .json()
        .await
        .context("Failed to decode tokeninfo response")?;

    if profile.aud != client_id {
        bail!("id token audience mismatch");
    }
    Ok(profile)
}

/// Derive a username candidate from an email's local part. The caller still
/// has to uniquify it against the credential store.
pub fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let cleaned: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect::<String>()
        .to_lowercase();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_from_email_local_part() {
        assert_eq!(username_from_email("noa@gmail.com"), "noa");
        assert_eq!(username_from_email("Noa.Cohen@gmail.com"), "noa.cohen");
    }

    #[test]
    fn test_username_from_email_strips_odd_characters() {
        assert_eq!(username_from_email("noa+spam@gmail.com"), "noaspam");
    }

    #[test]
    fn test_username_from_email_empty_falls_back() {
        assert_eq!(username_from_email("@gmail.com"), "user");
        assert_eq!(username_from_email(""), "user");
    }
}
