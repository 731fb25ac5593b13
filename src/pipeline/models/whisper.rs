use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;

use super::{MediaInput, ModelError, SpeechToText};

/// Speech-to-text against a whisper.cpp-compatible server (`POST /inference`).
#[derive(Debug, Clone)]
pub struct WhisperClient {
    base_url: String,
    client: reqwest::blocking::Client,
    language: String,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    text: String,
}

impl WhisperClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            language: "en".to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    fn form(&self, audio: &MediaInput) -> Form {
        let file_name = if audio.label.is_empty() {
            "audio.wav".to_string()
        } else {
            audio.label.clone()
        };
        Form::new()
            .part("file", Part::bytes(audio.bytes.to_vec()).file_name(file_name))
            .text("language", self.language.clone())
            .text("response_format", "json")
            .text("temperature", "0.0")
    }
}

impl SpeechToText for WhisperClient {
    /// Returns the trimmed transcript. A silent recording yields an empty
    /// string, not an error.
    fn transcribe(&self, audio: &MediaInput) -> Result<String, ModelError> {
        let url = format!("{}/inference", self.base_url);

        let response = self
            .client
            .post(&url)
            .multipart(self.form(audio))
            .send()
            .map_err(|e| ModelError::from_send(&e, &self.base_url, "stt", self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ModelError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: InferenceResponse = response
            .json()
            .map_err(|e| ModelError::ResponseParsing(e.to_string()))?;

        let transcript = parsed.text.trim().to_string();
        tracing::debug!(
            audio_bytes = audio.len(),
            transcript_len = transcript.len(),
            "Transcription complete"
        );
        Ok(transcript)
    }
}
