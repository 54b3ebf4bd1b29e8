//! Request handlers.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::chat::{ChatRequest, ChatResponse};
use crate::http::server::AppState;
use crate::resilience::BreakerSnapshot;

pub const SERVICE_NAME: &str = "mcp-chat-service";

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub circuit_breaker: BreakerSnapshot,
}

/// Liveness plus a read-only view of the circuit breaker.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        circuit_breaker: state.orchestrator.health(),
    })
}

/// Always answers 200 once the body parses; failures degrade inside the
/// orchestrator.
pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Json<ChatResponse> {
    Json(state.orchestrator.handle_chat(request).await)
}
