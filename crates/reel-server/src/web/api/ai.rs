use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub text: String,
}

/// POST /api/ai/enhance - Rewrite review text with the AI helper
#[tracing::instrument(skip(state, _auth, req))]
pub async fn enhance(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Json(req): Json<EnhanceRequest>,
) -> impl IntoResponse {
    let client = match &state.ai {
        Some(c) => c.clone(),
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "AI helper not configured"})),
            )
                .into_response()
        }
    };

    if req.text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "text is required"})),
        )
            .into_response();
    }

    match client.enhance_review(&req.text).await {
        Ok(text) => Json(json!({"text": text})).into_response(),
        Err(e) => {
            tracing::error!("AI enhancement failed: {:#}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "AI helper unavailable"})),
            )
                .into_response()
        }
    }
}
