//! `POST /api/ask`: one patient turn through the assistant pipeline.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::models::MediaInput;
use crate::pipeline::rag::conversation::lock;
use crate::pipeline::rag::QueryType;
use crate::pipeline::AssistRequest;

/// Media fields carry standard base64.
#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    pub session_id: Option<String>,
    pub text: Option<String>,
    pub audio: Option<String>,
    pub image: Option<String>,
    pub document: Option<String>,
    pub query_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub session_id: String,
    pub response: String,
    pub crisis_detected: bool,
    pub rejected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<BTreeMap<String, f64>>,
}

pub async fn ask(
    State(ctx): State<ApiContext>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let session_id = parse_session_id(req.session_id.as_deref())?;
    let request = AssistRequest {
        text: req.text,
        audio: decode_media(req.audio.as_deref(), "audio", "question.wav")?,
        image: decode_media(req.image.as_deref(), "image", "upload.png")?
            .map(require_image)
            .transpose()?,
        document: decode_media(req.document.as_deref(), "document", "upload.pdf")?
            .map(require_pdf)
            .transpose()?,
        query_type: req.query_type.as_deref().map(QueryType::parse),
    };

    let anonymous = session_id.is_none();
    let session = ctx.sessions.get_or_create(session_id);
    let pipeline = ctx.pipeline.clone();

    // Model calls block; keep them off the async workers.
    let (session_id, outcome) = tokio::task::spawn_blocking(move || {
        let mut session = lock(&session);
        let outcome = pipeline.respond(&mut session, &request);
        (session.id, outcome)
    })
    .await?;

    // Nothing was recorded; a caller without a session id has nothing to resume.
    if outcome.rejected && anonymous {
        ctx.sessions.remove(&session_id);
    }

    let (query_type, sources, latency) = match outcome.answer {
        Some(answer) => (
            Some(answer.query_type),
            answer.sources,
            answer.latency.map(|report| report.as_seconds()),
        ),
        None => (None, Vec::new(), None),
    };

    Ok(Json(AskResponse {
        session_id: session_id.to_string(),
        response: outcome.response,
        crisis_detected: outcome.crisis_detected,
        rejected: outcome.rejected,
        query_type,
        sources,
        latency,
    }))
}

fn parse_session_id(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => Uuid::parse_str(id)
            .map(Some)
            .map_err(|_| ApiError::BadRequest("Invalid session_id".into())),
        None => Ok(None),
    }
}

fn decode_media(
    encoded: Option<&str>,
    field: &str,
    label: &str,
) -> Result<Option<MediaInput>, ApiError> {
    let Some(encoded) = encoded.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid base64 in {field}")))?;
    Ok(Some(MediaInput::new(bytes, label)))
}

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];
const PDF_MAGIC: &[u8] = b"%PDF";

fn require_image(media: MediaInput) -> Result<MediaInput, ApiError> {
    if media.bytes.starts_with(JPEG_MAGIC) || media.bytes.starts_with(PNG_MAGIC) {
        Ok(media)
    } else {
        Err(ApiError::UnsupportedMedia {
            field: "image",
            expected: "JPEG or PNG",
        })
    }
}

fn require_pdf(media: MediaInput) -> Result<MediaInput, ApiError> {
    if media.bytes.starts_with(PDF_MAGIC) {
        Ok(media)
    } else {
        Err(ApiError::UnsupportedMedia {
            field: "document",
            expected: "PDF",
        })
    }
}
