use thiserror::Error;

/// Failures from the token service.
///
/// The HTTP layer collapses every variant into one uniform denial so clients
/// learn nothing about why a token was rejected. The variants matter
/// server-side: `Replayed` triggers the defensive full revocation of the
/// owner's token list, and `MissingSecret` marks a misconfigured deployment
/// where the auth subsystem must fail closed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,
    #[error("token is expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token subject no longer exists")]
    NotFound,
    #[error("refresh token was already consumed")]
    Replayed,
    #[error("signing secret is not configured")]
    MissingSecret,
    /// Credential-store failure underneath a token operation.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("username is already taken")]
    DuplicateUsername,
    #[error("email is already registered")]
    DuplicateEmail,
}

#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("user not found")]
    User,
    #[error("post not found")]
    Post,
    #[error("comment not found")]
    Comment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_messages_are_generic() {
        // None of the denial messages should mention secrets or store details.
        for err in [
            AuthError::Malformed,
            AuthError::Expired,
            AuthError::InvalidSignature,
            AuthError::NotFound,
            AuthError::Replayed,
        ] {
            let msg = err.to_string();
            assert!(!msg.contains("secret"), "{msg}");
        }
    }

    #[test]
    fn test_store_error_wraps_anyhow() {
        let err: AuthError = anyhow::anyhow!("connection refused").into();
        assert!(matches!(err, AuthError::Store(_)));
    }
}
