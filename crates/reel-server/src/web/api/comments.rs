use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reel_common::error::NotFoundError;
use reel_db::{CommentRepo, CommentRow, PostRepo, UserRepo};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: Uuid,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

fn comment_json(comment: &CommentRow) -> serde_json::Value {
    json!({
        "comment_id": comment.comment_id,
        "post_id": comment.post_id,
        "sender": comment.sender,
        "sender_id": comment.sender_id,
        "content": comment.content,
        "created_at": comment.created_at,
    })
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal server error"})),
    )
        .into_response()
}

fn comment_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": NotFoundError::Comment.to_string()})),
    )
        .into_response()
}

fn is_author(comment: &CommentRow, auth: &AuthUser) -> bool {
    match comment.sender_id {
        Some(id) => id == auth.user_id,
        None => comment.sender == auth.username,
    }
}

/// POST /api/comments - Comment on a post
///
/// The referenced post must exist at creation time; sender identity comes
/// from the verified token.
#[tracing::instrument(skip(state, auth, req))]
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<CreateCommentRequest>,
) -> impl IntoResponse {
    if req.content.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "content is required"})),
        )
            .into_response();
    }

    match PostRepo::get_by_id(&state.pool, req.post_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": NotFoundError::Post.to_string()})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to check post: {:#}", e);
            return internal_error();
        }
    }

    let user = match UserRepo::get_by_id(&state.pool, auth.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "access denied"})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("DB error during comment creation: {:#}", e);
            return internal_error();
        }
    };

    let comment_id = Uuid::new_v4();
    if let Err(e) = CommentRepo::create(
        &state.pool,
        comment_id,
        req.post_id,
        &user.username,
        Some(user.user_id),
        &req.content,
    )
    .await
    {
        tracing::error!("Failed to create comment: {:#}", e);
        return internal_error();
    }

    match CommentRepo::get_by_id(&state.pool, comment_id).await {
        Ok(Some(comment)) => (StatusCode::CREATED, Json(comment_json(&comment))).into_response(),
        Ok(None) | Err(_) => internal_error(),
    }
}

/// GET /api/comments/:id
#[tracing::instrument(skip(state))]
pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match CommentRepo::get_by_id(&state.pool, id).await {
        Ok(Some(comment)) => Json(comment_json(&comment)).into_response(),
        Ok(None) => comment_not_found(),
        Err(e) => {
            tracing::error!("Failed to get comment: {:#}", e);
            internal_error()
        }
    }
}

/// GET /api/posts/:id/comments - Comments on a post
#[tracing::instrument(skip(state))]
pub async fn list_post_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match PostRepo::get_by_id(&state.pool, id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": NotFoundError::Post.to_string()})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to check post: {:#}", e);
            return internal_error();
        }
    }

    match CommentRepo::list_by_post(&state.pool, id).await {
        Ok(comments) => {
            let comments_json: Vec<serde_json::Value> = comments.iter().map(comment_json).collect();
            Json(comments_json).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list comments: {:#}", e);
            internal_error()
        }
    }
}

/// PUT /api/comments/:id - Update own comment
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCommentRequest>,
) -> impl IntoResponse {
    if req.content.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "content is required"})),
        )
            .into_response();
    }

    let comment = match CommentRepo::get_by_id(&state.pool, id).await {
        Ok(Some(c)) => c,
        Ok(None) => return comment_not_found(),
        Err(e) => {
            tracing::error!("Failed to get comment: {:#}", e);
            return internal_error();
        }
    };

    if !is_author(&comment, &auth) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "can only modify your own comments"})),
        )
            .into_response();
    }

    // Same conditional-update contract as posts: the denormalized sender
    // must still exist
    match UserRepo::get_by_username(&state.pool, &comment.sender).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "sender no longer exists"})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to check sender: {:#}", e);
            return internal_error();
        }
    }

    match CommentRepo::update(&state.pool, id, &req.content).await {
        Ok(true) => {}
        Ok(false) => return comment_not_found(),
        Err(e) => {
            tracing::error!("Failed to update comment: {:#}", e);
            return internal_error();
        }
    }

    match CommentRepo::get_by_id(&state.pool, id).await {
        Ok(Some(comment)) => Json(comment_json(&comment)).into_response(),
        Ok(None) | Err(_) => internal_error(),
    }
}

/// DELETE /api/comments/:id - Delete own comment
#[tracing::instrument(skip(state, auth))]
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let comment = match CommentRepo::get_by_id(&state.pool, id).await {
        Ok(Some(c)) => c,
        Ok(None) => return comment_not_found(),
        Err(e) => {
            tracing::error!("Failed to get comment: {:#}", e);
            return internal_error();
        }
    };

    if !is_author(&comment, &auth) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "can only modify your own comments"})),
        )
            .into_response();
    }

    match CommentRepo::delete(&state.pool, id).await {
        Ok(true) => Json(json!({"status": "deleted"})).into_response(),
        Ok(false) => comment_not_found(),
        Err(e) => {
            tracing::error!("Failed to delete comment: {:#}", e);
            internal_error()
        }
    }
}
