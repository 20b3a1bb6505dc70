//! HTTP surface: one conversational endpoint plus a health probe. The
//! service holds no session state; the memory blob travels with every
//! request and comes back updated in the response.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use barista_agent::PipelineController;
use barista_core::{ConversationTurn, Memory};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::bootstrap::Readiness;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineController>,
    pub readiness: Readiness,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat", post(chat))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub turns: Vec<ConversationTurn>,
    #[serde(default)]
    pub memory: Memory,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub memory: Memory,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<Value>)> {
    if request.turns.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "turns must contain at least one turn" })),
        ));
    }

    let reply = state.pipeline.process(&request.turns, &request.memory).await;
    info!(
        event_name = "server.chat.replied",
        turn_count = request.turns.len(),
        agent = ?reply.memory.agent,
        "chat turn processed"
    );
    Ok(Json(ChatResponse { reply: reply.message, memory: reply.memory }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub menu_items: usize,
    pub association_rules: usize,
    pub popularity_entries: usize,
    pub checked_at: String,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        menu_items: state.readiness.menu_items,
        association_rules: state.readiness.association_rules,
        popularity_entries: state.readiness.popularity_entries,
        checked_at: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(payload))
}
