//! Conversation session management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// `DELETE /api/sessions/:id`: forget a conversation's history.
pub async fn clear(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::BadRequest("Invalid session id".into()))?;

    if ctx.sessions.remove(&id) {
        tracing::info!(session = %id, "Session cleared");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Session not found".into()))
    }
}
