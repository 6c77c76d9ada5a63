use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use reel_common::error::{ConflictError, NotFoundError};
use reel_db::{IdentityPropagator, UserRepo, UserRow};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Public shape of a user; never exposes the password hash or token list.
pub(crate) fn user_json(user: &UserRow) -> serde_json::Value {
    json!({
        "user_id": user.user_id,
        "username": user.username,
        "email": user.email,
        "description": user.description,
        "profile_pic": user.profile_pic,
        "created_at": user.created_at,
    })
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub description: Option<String>,
    pub profile_pic: Option<String>,
}

/// GET /api/users - List users
#[tracing::instrument(skip(state))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> impl IntoResponse {
    let users = match UserRepo::list(&state.pool, query.limit, query.offset).await {
        Ok(u) => u,
        Err(e) => {
            tracing::error!("Failed to list users: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    };

    let users_json: Vec<serde_json::Value> = users.iter().map(user_json).collect();
    Json(users_json).into_response()
}

/// GET /api/users/:id - Get user detail
#[tracing::instrument(skip(state))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user_id = match id.parse::<Uuid>() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid user ID"})),
            )
                .into_response();
        }
    };

    match UserRepo::get_by_id(&state.pool, user_id).await {
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

/// PUT /api/users/:id - Update own profile
///
/// A username change runs the rename propagation: every post and comment
/// sent under the old name is rewritten in the same transaction as the
/// user row.
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    let user_id = match id.parse::<Uuid>() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid user ID"})),
            )
                .into_response();
        }
    };

    // Identity comes from the verified token, not the path
    if auth.user_id != user_id {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "can only modify your own account"})),
        )
            .into_response();
    }

    let user = match UserRepo::get_by_id(&state.pool, user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": NotFoundError::User.to_string()})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to get user: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    };

    // Uniqueness checks exclude the row being updated: keeping your own
    // email or username is not a collision
    if let Some(email) = &req.email {
        match UserRepo::email_taken(&state.pool, email, Some(user_id)).await {
            Ok(false) => {}
            Ok(true) => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({"error": ConflictError::DuplicateEmail.to_string()})),
                )
                    .into_response()
            }
            Err(e) => {
                tracing::error!("Failed to check email: {:#}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response();
            }
        }
    }

    let new_username = req.username.as_deref().filter(|u| *u != user.username);
    if let Some(username) = new_username {
        if username.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "username must not be empty"})),
            )
                .into_response();
        }
        match UserRepo::username_taken(&state.pool, username, Some(user_id)).await {
            Ok(false) => {}
            Ok(true) => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({"error": ConflictError::DuplicateUsername.to_string()})),
                )
                    .into_response()
            }
            Err(e) => {
                tracing::error!("Failed to check username: {:#}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response();
            }
        }
    }

    if let Err(e) = UserRepo::update_profile(
        &state.pool,
        user_id,
        req.email.as_deref(),
        req.description.as_deref(),
        req.profile_pic.as_deref(),
    )
    .await
    {
        tracing::error!("Failed to update profile: {:#}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        )
            .into_response();
    }

    if let Some(username) = new_username {
        if let Err(e) = IdentityPropagator::rename_user(
            &state.pool,
            user_id,
            username,
            req.profile_pic.as_deref(),
        )
        .await
        {
            tracing::error!("Failed to propagate rename: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    }

    match UserRepo::get_by_id(&state.pool, user_id).await {
        Ok(Some(user)) => Json(user_json(&user)).into_response(),
        Ok(None) | Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        )
            .into_response(),
    }
}

/// DELETE /api/users/:id - Delete own account
///
/// The delete propagation removes every post and comment the user sent in
/// the same transaction as the user row, so no orphaned content survives.
#[tracing::instrument(skip(state, auth))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user_id = match id.parse::<Uuid>() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid user ID"})),
            )
                .into_response();
        }
    };

    if auth.user_id != user_id {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "can only modify your own account"})),
        )
            .into_response();
    }

    match IdentityPropagator::delete_user(&state.pool, user_id).await {
        Ok(true) => Json(json!({"status": "deleted"})).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": NotFoundError::User.to_string()})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to delete user: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response()
        }
    }
}
