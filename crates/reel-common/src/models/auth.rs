use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User model (safe for client responses -- no password hash, no token list)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub description: String,
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Which flow a token is valid for. Access tokens authenticate resource
/// requests; refresh tokens are only accepted by the refresh and logout
/// endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims. Decoding is strict: a payload with missing or unknown
/// fields does not verify.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    /// Fresh random nonce per mint, so two pairs issued in the same second
    /// are never byte-identical.
    pub jti: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// An access/refresh pair as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TokenKind::Access).unwrap(), "\"access\"");
        assert_eq!(serde_json::to_string(&TokenKind::Refresh).unwrap(), "\"refresh\"");
    }

    #[test]
    fn test_claims_roundtrip() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "noa".to_string(),
            jti: Uuid::new_v4().to_string(),
            kind: TokenKind::Refresh,
            iat: 1_700_000_000,
            exp: 1_700_604_800,
        };
        let json = serde_json::to_string(&claims).unwrap();
        let back: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sub, claims.sub);
        assert_eq!(back.kind, TokenKind::Refresh);
        assert_eq!(back.jti, claims.jti);
    }

    #[test]
    fn test_claims_reject_unknown_kind() {
        let json = r#"{"sub":"x","username":"noa","jti":"n","kind":"session","iat":0,"exp":0}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
    }

    #[test]
    fn test_claims_reject_extra_fields() {
        let json = r#"{"sub":"x","username":"noa","jti":"n","kind":"access","iat":0,"exp":0,"role":"admin"}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
    }

    #[test]
    fn test_claims_reject_missing_fields() {
        let json = r#"{"sub":"x","iat":0,"exp":0}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
    }
}
