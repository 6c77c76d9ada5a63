use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use reel_common::error::AuthError;
use reel_common::models::auth::{Claims, TokenKind, TokenPair};
use reel_db::{RefreshTokenStore, UserRepo};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AuthConfig;

/// Hash a password using argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Mint an access/refresh pair for a user.
///
/// Both tokens are signed with the same secret but carry different `kind`
/// and expiry claims, plus a shared random `jti` so two pairs minted in the
/// same second are never byte-identical. The service itself is stateless:
/// the caller must store `hash_refresh_token(&pair.refresh_token)` in the
/// owner's list for the refresh flow to accept it later.
pub fn issue_tokens(cfg: &AuthConfig, user_id: Uuid, username: &str) -> Result<TokenPair, AuthError> {
    if cfg.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let now = chrono::Utc::now().timestamp();
    let jti = Uuid::new_v4().to_string();

    let access_token = sign(
        cfg,
        &Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            jti: jti.clone(),
            kind: TokenKind::Access,
            iat: now,
            exp: now + cfg.access_ttl_secs,
        },
    )?;
    let refresh_token = sign(
        cfg,
        &Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            jti,
            kind: TokenKind::Refresh,
            iat: now,
            exp: now + cfg.refresh_ttl_secs,
        },
    )?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

fn sign(cfg: &AuthConfig, claims: &Claims) -> Result<String, AuthError> {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuthError::Store(anyhow::Error::new(e)))
}

/// Validate a token's signature, expiry and kind.
///
/// A structurally valid token of the wrong kind is reported as `Malformed`:
/// access tokens authenticate resource requests, refresh tokens are only
/// accepted by the refresh and logout flows.
pub fn verify_token(
    token: &str,
    cfg: &AuthConfig,
    expected: TokenKind,
) -> Result<Claims, AuthError> {
    if cfg.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::Malformed,
    })?;

    if data.claims.kind != expected {
        return Err(AuthError::Malformed);
    }
    Ok(data.claims)
}

/// Hash a refresh token for server-side storage using SHA256
pub fn hash_refresh_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Exchange a refresh token for a new pair, consuming the old one.
///
/// The stored hash is swapped for the new one in a single guarded
/// statement, so a refresh token is usable exactly once. Presenting a token
/// that verifies but is no longer in the owner's list is treated as a
/// replay: the entire list is cleared before the call fails, forcing every
/// session of that user to re-authenticate.
pub async fn rotate_refresh_tokens(
    pool: &PgPool,
    cfg: &AuthConfig,
    raw_token: &str,
) -> Result<TokenPair, AuthError> {
    let claims = verify_token(raw_token, cfg, TokenKind::Refresh)?;
    let user_id: Uuid = claims.sub.parse().map_err(|_| AuthError::Malformed)?;

    let user = UserRepo::get_by_id(pool, user_id)
        .await?
        .ok_or(AuthError::NotFound)?;

    let pair = issue_tokens(cfg, user.user_id, &user.username)?;

    let old_hash = hash_refresh_token(raw_token);
    let new_hash = hash_refresh_token(&pair.refresh_token);
    let replaced = RefreshTokenStore::replace(pool, user.user_id, &old_hash, &new_hash).await?;
    if !replaced {
        RefreshTokenStore::clear(pool, user.user_id).await?;
        return Err(AuthError::Replayed);
    }

    Ok(pair)
}

/// Remove one refresh token from its owner's list (logout). Removing a
/// token that is already absent is a no-op; a token that fails verification
/// is rejected.
pub async fn revoke_refresh_token(
    pool: &PgPool,
    cfg: &AuthConfig,
    raw_token: &str,
) -> Result<(), AuthError> {
    let claims = verify_token(raw_token, cfg, TokenKind::Refresh)?;
    let user_id: Uuid = claims.sub.parse().map_err(|_| AuthError::Malformed)?;

    let user = UserRepo::get_by_id(pool, user_id)
        .await?
        .ok_or(AuthError::NotFound)?;

    RefreshTokenStore::remove(pool, user.user_id, &hash_refresh_token(raw_token)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-jwt-secret".to_string(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 604_800,
            google_client_id: None,
            initial_user: None,
        }
    }

    #[test]
    fn test_password_hash_and_verify_correct() {
        let password = "my-secure-password";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).unwrap());
    }

    #[test]
    fn test_password_verify_wrong() {
        let hash = hash_password("correct-password").unwrap();
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_password_different_salts() {
        let password = "same-password";
        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();
        assert_ne!(hash1, hash2);
        // Both still verify
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let cfg = test_config();
        let user_id = Uuid::new_v4();

        let pair = issue_tokens(&cfg, user_id, "noa").unwrap();

        let access = verify_token(&pair.access_token, &cfg, TokenKind::Access).unwrap();
        assert_eq!(access.sub, user_id.to_string());
        assert_eq!(access.username, "noa");

        let refresh = verify_token(&pair.refresh_token, &cfg, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.sub, user_id.to_string());
        assert_eq!(refresh.jti, access.jti);
    }

    #[test]
    fn test_issue_twice_produces_distinct_pairs() {
        let cfg = test_config();
        let user_id = Uuid::new_v4();

        // Two pairs for the same user in the same instant must differ (jti nonce)
        let first = issue_tokens(&cfg, user_id, "noa").unwrap();
        let second = issue_tokens(&cfg, user_id, "noa").unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_missing_secret_fails_closed() {
        let mut cfg = test_config();
        cfg.jwt_secret = String::new();

        let minted = issue_tokens(&cfg, Uuid::new_v4(), "noa");
        assert!(matches!(minted, Err(AuthError::MissingSecret)));

        let verified = verify_token("anything", &cfg, TokenKind::Access);
        assert!(matches!(verified, Err(AuthError::MissingSecret)));
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let cfg = test_config();
        let pair = issue_tokens(&cfg, Uuid::new_v4(), "noa").unwrap();

        let mut other = test_config();
        other.jwt_secret = "different-secret".to_string();
        let result = verify_token(&pair.access_token, &other, TokenKind::Access);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut cfg = test_config();
        cfg.access_ttl_secs = -300; // already expired when minted, beyond validation leeway

        let pair = issue_tokens(&cfg, Uuid::new_v4(), "noa").unwrap();
        let result = verify_token(&pair.access_token, &cfg, TokenKind::Access);
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let cfg = test_config();
        let result = verify_token("not.a.jwt", &cfg, TokenKind::Access);
        assert!(matches!(result, Err(AuthError::Malformed)));
    }

    #[test]
    fn test_refresh_token_rejected_on_resource_path() {
        let cfg = test_config();
        let pair = issue_tokens(&cfg, Uuid::new_v4(), "noa").unwrap();

        // A refresh token must not authenticate a resource request
        let result = verify_token(&pair.refresh_token, &cfg, TokenKind::Access);
        assert!(matches!(result, Err(AuthError::Malformed)));

        // And an access token must not drive the refresh flow
        let result = verify_token(&pair.access_token, &cfg, TokenKind::Refresh);
        assert!(matches!(result, Err(AuthError::Malformed)));
    }

    #[test]
    fn test_refresh_token_hash_determinism() {
        let raw = "fixed-token-value";
        let hash1 = hash_refresh_token(raw);
        let hash2 = hash_refresh_token(raw);
        assert_eq!(hash1, hash2);
        assert_ne!(hash_refresh_token("other-token"), hash1);
    }
}
