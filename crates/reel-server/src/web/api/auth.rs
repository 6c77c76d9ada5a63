use crate::auth::{
    hash_password, hash_refresh_token, issue_tokens, revoke_refresh_token, rotate_refresh_tokens,
    verify_password,
};
use crate::google::{username_from_email, verify_google_id_token};
use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use crate::web::api::users::user_json;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use reel_common::error::{AuthError, ConflictError, NotFoundError};
use reel_db::{RefreshTokenStore, UserRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// POST /api/auth/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    if req.email.is_empty() || req.username.is_empty() || req.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "email, username and password are required"})),
        )
            .into_response();
    }

    match UserRepo::email_taken(&state.pool, &req.email, None).await {
        Ok(false) => {}
        Ok(true) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({"error": ConflictError::DuplicateEmail.to_string()})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("DB error during registration: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    }

    match UserRepo::username_taken(&state.pool, &req.username, None).await {
        Ok(false) => {}
        Ok(true) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({"error": ConflictError::DuplicateUsername.to_string()})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("DB error during registration: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    }

    let password_hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Failed to hash password: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    };

    let user_id = Uuid::new_v4();
    if let Err(e) = UserRepo::create(
        &state.pool,
        user_id,
        &req.email,
        &req.username,
        Some(&password_hash),
    )
    .await
    {
        tracing::error!("Failed to create user: {:#}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        )
            .into_response();
    }

    match UserRepo::get_by_id(&state.pool, user_id).await {
        Ok(Some(user)) => (StatusCode::CREATED, Json(user_json(&user))).into_response(),
        Ok(None) | Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        )
            .into_response(),
    }
}

/// POST /api/auth/login
#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let auth_config = match &state.config.auth {
        Some(cfg) => cfg,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "Authentication not configured"})),
            )
                .into_response()
        }
    };

    let user = match UserRepo::get_by_email(&state.pool, &req.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid email or password"})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("DB error during login: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    };

    let password_hash = match &user.password_hash {
        Some(h) => h,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid email or password"})),
            )
                .into_response()
        }
    };

    match verify_password(&req.password, password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid email or password"})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Password verification error: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    }

    issue_and_store(&state, auth_config, user.user_id, &user.username)
        .await
        .into_response()
}

/// POST /api/auth/google
#[tracing::instrument(skip(state, req))]
pub async fn login_google(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleLoginRequest>,
) -> impl IntoResponse {
    let auth_config = match &state.config.auth {
        Some(cfg) => cfg,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "Authentication not configured"})),
            )
                .into_response()
        }
    };
    let client_id = match &auth_config.google_client_id {
        Some(id) => id,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "Google login not configured"})),
            )
                .into_response()
        }
    };

    let profile = match verify_google_id_token(&state.http, client_id, &req.id_token).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Google id token rejected: {:#}", e);
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "access denied"})),
            )
                .into_response();
        }
    };

    // First Google login creates the account; later logins find it by email
    let user = match UserRepo::get_by_email(&state.pool, &profile.email).await {
        Ok(Some(u)) => u,
        Ok(None) => match create_google_user(&state, &profile.email, profile.picture.as_deref())
            .await
        {
            Ok(u) => u,
            Err(e) => {
                tracing::error!("Failed to create Google user: {:#}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response();
            }
        },
        Err(e) => {
            tracing::error!("DB error during Google login: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    };

    issue_and_store(&state, auth_config, user.user_id, &user.username)
        .await
        .into_response()
}

async fn create_google_user(
    state: &AppState,
    email: &str,
    picture: Option<&str>,
) -> anyhow::Result<reel_db::UserRow> {
    let base = username_from_email(email);
    let mut username = base.clone();
    // Uniquify against existing accounts with the same local part
    while UserRepo::username_taken(&state.pool, &username, None).await? {
        let suffix = Uuid::new_v4().simple().to_string();
        username = format!("{}-{}", base, &suffix[..8]);
    }

    let user_id = Uuid::new_v4();
    UserRepo::create(&state.pool, user_id, email, &username, None).await?;
    if picture.is_some() {
        UserRepo::update_profile(&state.pool, user_id, None, None, picture).await?;
    }
    UserRepo::get_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user missing after creation"))
}

/// Mint a pair and persist the refresh hash in the owner's list.
async fn issue_and_store(
    state: &AppState,
    auth_config: &crate::config::AuthConfig,
    user_id: Uuid,
    username: &str,
) -> axum::response::Response {
    let pair = match issue_tokens(auth_config, user_id, username) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to issue tokens: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    };

    let refresh_hash = hash_refresh_token(&pair.refresh_token);
    if let Err(e) = RefreshTokenStore::push(&state.pool, user_id, &refresh_hash).await {
        tracing::error!("Failed to store refresh token: {:#}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        )
            .into_response();
    }

    Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user_id,
        username: username.to_string(),
    })
    .into_response()
}

/// POST /api/auth/refresh
#[tracing::instrument(skip(state, req))]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> impl IntoResponse {
    let auth_config = match &state.config.auth {
        Some(cfg) => cfg,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "Authentication not configured"})),
            )
                .into_response()
        }
    };

    match rotate_refresh_tokens(&state.pool, auth_config, &req.refresh_token).await {
        Ok(pair) => Json(json!({
            "access_token": pair.access_token,
            "refresh_token": pair.refresh_token,
        }))
        .into_response(),
        Err(AuthError::Replayed) => {
            // The defensive full revocation already ran; the client still
            // only sees the uniform denial
            tracing::warn!("Refresh token replay detected, session list cleared");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "access denied"})),
            )
                .into_response()
        }
        Err(AuthError::Store(e)) => {
            tracing::error!("DB error during refresh: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::debug!("Refresh rejected: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "access denied"})),
            )
                .into_response()
        }
    }
}

/// POST /api/auth/logout
#[tracing::instrument(skip(state, req))]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> impl IntoResponse {
    let auth_config = match &state.config.auth {
        Some(cfg) => cfg,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "Authentication not configured"})),
            )
                .into_response()
        }
    };

    match revoke_refresh_token(&state.pool, auth_config, &req.refresh_token).await {
        Ok(()) => Json(json!({"status": "ok"})).into_response(),
        Err(AuthError::Store(e)) => {
            tracing::error!("DB error during logout: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::debug!("Logout rejected: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "access denied"})),
            )
                .into_response()
        }
    }
}

/// GET /api/auth/me
#[tracing::instrument(skip(state))]
pub async fn me(State(state): State<Arc<AppState>>, auth: AuthUser) -> impl IntoResponse {
    match UserRepo::get_by_id(&state.pool, auth.user_id).await {
        Ok(Some(user)) => Json(user_json(&user)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": NotFoundError::User.to_string()})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to get user: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response()
        }
    }
}
