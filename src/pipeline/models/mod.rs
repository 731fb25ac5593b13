//! External model collaborators: speech-to-text, vision extraction, text
//! generation. The pipeline only sees the traits; HTTP and mock
//! implementations live in the submodules.

pub mod invoke;
pub mod mock;
pub mod ollama;
pub mod pdf;
pub mod whisper;

use std::sync::Arc;

use thiserror::Error;

use crate::pipeline::rag::conversation::ConversationTurn;
use crate::pipeline::rag::prompt::PDF_IMAGE_EXTRACTION_PROMPT;

pub use invoke::{call_with_policy, CallPolicy};
pub use mock::{MockSpeechToText, MockTextGenerator, MockVisionExtractor};
pub use ollama::{OllamaTextGenerator, OllamaVisionExtractor};
pub use whisper::WhisperClient;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Cannot connect to model service at {0}")]
    Connection(String),

    #[error("{phase} call timed out after {secs}s")]
    Timeout { phase: &'static str, secs: u64 },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Model service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to parse model response: {0}")]
    ResponseParsing(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("PDF processing failed: {0}")]
    Pdf(String),

    #[error("Image processing failed: {0}")]
    Image(String),

    #[error("Model worker stopped unexpectedly")]
    WorkerLost,
}

impl ModelError {
    /// Transport failures and server-side errors are worth another attempt;
    /// bad input and unparseable output are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout { .. } | Self::HttpClient(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Map a failed request send. `secs` is the client's configured timeout.
    pub(crate) fn from_send(
        err: &reqwest::Error,
        base_url: &str,
        phase: &'static str,
        secs: u64,
    ) -> Self {
        if err.is_timeout() {
            Self::Timeout { phase, secs }
        } else if err.is_connect() {
            Self::Connection(base_url.to_string())
        } else {
            Self::HttpClient(err.to_string())
        }
    }
}

/// Raw bytes of one uploaded file. Cheap to clone across retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInput {
    pub bytes: Arc<[u8]>,
    /// Filename or description, used only for logging and multipart names.
    pub label: String,
}

impl MediaInput {
    pub fn new(bytes: impl Into<Arc<[u8]>>, label: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            label: label.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Everything the text generator needs for one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Trailing history window, oldest first.
    pub history: Vec<ConversationTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub trait SpeechToText: Send + Sync {
    fn transcribe(&self, audio: &MediaInput) -> Result<String, ModelError>;
}

pub trait VisionExtractor: Send + Sync {
    fn analyze_image(&self, image: &MediaInput, instruction: &str) -> Result<String, ModelError>;

    /// Analyze every embedded image of a PDF, one `analyze_image` call per
    /// image, concatenating `[Page p, Image i]: …` sections.
    fn analyze_pdf(&self, document: &MediaInput) -> Result<String, ModelError> {
        let images = pdf::extract_embedded_images(&document.bytes)?;
        let mut analysis = String::new();
        for image in &images {
            let media = MediaInput::new(image.png.clone(), image.label());
            let text = self.analyze_image(&media, PDF_IMAGE_EXTRACTION_PROMPT)?;
            analysis.push_str(&format!(
                "\n[Page {}, Image {}]: {}",
                image.page, image.index, text
            ));
        }
        tracing::debug!(images = images.len(), "PDF analysis complete");
        Ok(analysis)
    }
}

pub trait TextGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ModelError::Connection("http://localhost:11434".into()).is_retryable());
        assert!(ModelError::Timeout { phase: "llm", secs: 30 }.is_retryable());
        assert!(ModelError::Http { status: 503, body: String::new() }.is_retryable());
        assert!(!ModelError::Http { status: 400, body: String::new() }.is_retryable());
        assert!(!ModelError::ResponseParsing("bad json".into()).is_retryable());
        assert!(!ModelError::Pdf("broken".into()).is_retryable());
    }

    #[test]
    fn media_input_from_vec() {
        let media = MediaInput::new(vec![1u8, 2, 3], "scan.png");
        assert_eq!(media.len(), 3);
        assert_eq!(media.label, "scan.png");
        assert!(!media.is_empty());
    }

    #[test]
    fn collaborators_are_object_safe() {
        fn _stt(_: &dyn SpeechToText) {}
        fn _vlm(_: &dyn VisionExtractor) {}
        fn _llm(_: &dyn TextGenerator) {}
    }
}
