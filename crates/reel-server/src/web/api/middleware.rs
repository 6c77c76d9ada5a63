use crate::auth::verify_token;
use crate::state::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reel_common::models::auth::TokenKind;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Extractor that validates a Bearer access token and provides the verified
/// identity as trusted request context. Handlers must take identity from
/// here, never from a client-supplied id or username.
///
/// Every failure mode -- missing header, malformed header, bad signature,
/// expired token, wrong token kind, unconfigured auth -- collapses into the
/// same denial so clients cannot probe why a token was rejected.
#[derive(Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

fn access_denied() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "access denied"})),
    )
        .into_response()
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_config = match &state.config.auth {
            Some(cfg) => cfg,
            None => return Err(access_denied()),
        };

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match auth_header.and_then(|val| val.strip_prefix("Bearer ")) {
            Some(t) => t,
            None => return Err(access_denied()),
        };

        let claims = match verify_token(token, auth_config, TokenKind::Access) {
            Ok(claims) => claims,
            Err(_) => return Err(access_denied()),
        };

        let user_id = match claims.sub.parse::<Uuid>() {
            Ok(id) => id,
            Err(_) => return Err(access_denied()),
        };

        Ok(AuthUser {
            user_id,
            username: claims.username,
        })
    }
}
