pub mod ai;
pub mod auth;
pub mod comments;
pub mod middleware;
pub mod posts;
pub mod users;

use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{routing::get, routing::post, routing::put, Json, Router};
use serde_json::json;
use std::sync::Arc;

/// GET /api/config -- public endpoint returning feature availability for clients
async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "auth_required": state.config.auth.is_some(),
        "ai_enabled": state.config.ai.is_some(),
        "google_login": state
            .config
            .auth
            .as_ref()
            .is_some_and(|a| a.google_client_id.is_some()),
    }))
}

pub fn build_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Public config endpoint
        .route("/config", get(get_config))
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/google", post(auth::login_google))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // User routes
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Post routes
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/post", get(posts::get_posts_by_sender))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/{id}/like", put(posts::like_post))
        .route("/posts/{id}/unlike", put(posts::unlike_post))
        .route("/posts/{id}/liked", get(posts::is_liked))
        .route("/posts/{id}/comments", get(comments::list_post_comments))
        // Comment routes
        .route("/comments", post(comments::create_comment))
        .route(
            "/comments/{id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        // AI helper
        .route("/ai/enhance", post(ai::enhance))
        .with_state(state)
}
