use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reel_common::error::NotFoundError;
use reel_db::{PostRepo, PostRow, UserRepo};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct SenderQuery {
    pub sender: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

pub(crate) fn post_json(post: &PostRow) -> serde_json::Value {
    json!({
        "post_id": post.post_id,
        "title": post.title,
        "content": post.content,
        "sender": post.sender,
        "sender_id": post.sender_id,
        "likes": post.likes,
        "image_url": post.image_url,
        "profile_pic": post.profile_pic,
        "created_at": post.created_at,
    })
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal server error"})),
    )
        .into_response()
}

fn post_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": NotFoundError::Post.to_string()})),
    )
        .into_response()
}

/// The author owns a post. Old rows without a sender id fall back to the
/// username match.
fn is_author(post: &PostRow, auth: &AuthUser) -> bool {
    match post.sender_id {
        Some(id) => id == auth.user_id,
        None => post.sender == auth.username,
    }
}

/// POST /api/posts - Create a post
///
/// Sender identity comes from the verified token only. The account is
/// re-checked because a valid access token can outlive its user.
#[tracing::instrument(skip(state, auth, req))]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<CreatePostRequest>,
) -> impl IntoResponse {
    if req.content.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "content is required"})),
        )
            .into_response();
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
            tracing::error!("DB error during post creation: {:#}", e);
            return internal_error();
        }
    };

    let post_id = Uuid::new_v4();
    if let Err(e) = PostRepo::create(
        &state.pool,
        post_id,
        req.title.as_deref(),
        &req.content,
        &user.username,
        Some(user.user_id),
        req.image_url.as_deref(),
        user.profile_pic.as_deref(),
    )
    .await
    {
        tracing::error!("Failed to create post: {:#}", e);
        return internal_error();
    }

    match PostRepo::get_by_id(&state.pool, post_id).await {
        Ok(Some(post)) => (StatusCode::CREATED, Json(post_json(&post))).into_response(),
        Ok(None) | Err(_) => internal_error(),
    }
}

/// GET /api/posts - List posts, newest first
#[tracing::instrument(skip(state))]
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListPostsQuery>,
) -> impl IntoResponse {
    match PostRepo::list(&state.pool, query.limit, query.offset).await {
        Ok(posts) => {
            let posts_json: Vec<serde_json::Value> = posts.iter().map(post_json).collect();
            Json(posts_json).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list posts: {:#}", e);
            internal_error()
        }
    }
}

/// GET /api/post?sender=username - Posts by sender
#[tracing::instrument(skip(state))]
pub async fn get_posts_by_sender(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SenderQuery>,
) -> impl IntoResponse {
    match PostRepo::list_by_sender(&state.pool, &query.sender).await {
        Ok(posts) => {
            let posts_json: Vec<serde_json::Value> = posts.iter().map(post_json).collect();
            Json(posts_json).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list posts by sender: {:#}", e);
            internal_error()
        }
    }
}

/// GET /api/posts/:id
#[tracing::instrument(skip(state))]
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match PostRepo::get_by_id(&state.pool, id).await {
        Ok(Some(post)) => Json(post_json(&post)).into_response(),
        Ok(None) => post_not_found(),
        Err(e) => {
            tracing::error!("Failed to get post: {:#}", e);
            internal_error()
        }
    }
}

/// PUT /api/posts/:id - Update own post
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> impl IntoResponse {
    let post = match PostRepo::get_by_id(&state.pool, id).await {
        Ok(Some(p)) => p,
        Ok(None) => return post_not_found(),
        Err(e) => {
            tracing::error!("Failed to get post: {:#}", e);
            return internal_error();
        }
    };

    if !is_author(&post, &auth) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "can only modify your own posts"})),
        )
            .into_response();
    }

    // The denormalized sender must still resolve to a live account before
    // the post is touched
    match UserRepo::get_by_username(&state.pool, &post.sender).await {
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

    match PostRepo::update(
        &state.pool,
        id,
        req.title.as_deref(),
        req.content.as_deref(),
        req.image_url.as_deref(),
    )
    .await
    {
        Ok(true) => {}
        Ok(false) => return post_not_found(),
        Err(e) => {
            tracing::error!("Failed to update post: {:#}", e);
            return internal_error();
        }
    }

    match PostRepo::get_by_id(&state.pool, id).await {
        Ok(Some(post)) => Json(post_json(&post)).into_response(),
        Ok(None) | Err(_) => internal_error(),
    }
}

/// DELETE /api/posts/:id - Delete own post together with its comments
#[tracing::instrument(skip(state, auth))]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let post = match PostRepo::get_by_id(&state.pool, id).await {
        Ok(Some(p)) => p,
        Ok(None) => return post_not_found(),
        Err(e) => {
            tracing::error!("Failed to get post: {:#}", e);
            return internal_error();
        }
    };

    if !is_author(&post, &auth) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "can only modify your own posts"})),
        )
            .into_response();
    }

    match PostRepo::delete_with_comments(&state.pool, id).await {
        Ok(true) => Json(json!({"status": "deleted"})).into_response(),
        Ok(false) => post_not_found(),
        Err(e) => {
            tracing::error!("Failed to delete post: {:#}", e);
            internal_error()
        }
    }
}

/// PUT /api/posts/:id/like
#[tracing::instrument(skip(state, auth))]
pub async fn like_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    // Liking an already-liked post is a no-op, not an error
    match PostRepo::add_like(&state.pool, id, auth.user_id).await {
        Ok(true) => Json(json!({"liked": true})).into_response(),
        Ok(false) => match PostRepo::get_by_id(&state.pool, id).await {
            Ok(Some(_)) => Json(json!({"liked": true})).into_response(),
            Ok(None) => post_not_found(),
            Err(e) => {
                tracing::error!("Failed to get post: {:#}", e);
                internal_error()
            }
        },
        Err(e) => {
            tracing::error!("Failed to like post: {:#}", e);
            internal_error()
        }
    }
}

/// PUT /api/posts/:id/unlike
#[tracing::instrument(skip(state, auth))]
pub async fn unlike_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match PostRepo::remove_like(&state.pool, id, auth.user_id).await {
        Ok(true) => Json(json!({"liked": false})).into_response(),
        Ok(false) => match PostRepo::get_by_id(&state.pool, id).await {
            Ok(Some(_)) => Json(json!({"liked": false})).into_response(),
            Ok(None) => post_not_found(),
            Err(e) => {
                tracing::error!("Failed to get post: {:#}", e);
                internal_error()
            }
        },
        Err(e) => {
            tracing::error!("Failed to unlike post: {:#}", e);
            internal_error()
        }
    }
}

/// GET /api/posts/:id/liked - Does the caller like this post?
#[tracing::instrument(skip(state, auth))]
pub async fn is_liked(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match PostRepo::is_liked(&state.pool, id, auth.user_id).await {
        Ok(Some(liked)) => Json(json!({"liked": liked})).into_response(),
        Ok(None) => post_not_found(),
        Err(e) => {
            tracing::error!("Failed to check like: {:#}", e);
            internal_error()
        }
    }
}
