//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub knowledge_entities: usize,
    pub active_sessions: usize,
    pub version: &'static str,
}

/// `GET /api/health`: liveness plus knowledge base size.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        knowledge_entities: ctx.pipeline.retriever().store().len(),
        active_sessions: ctx.sessions.len(),
        version: crate::config::APP_VERSION,
    })
}
