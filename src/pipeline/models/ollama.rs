use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{GenerationRequest, MediaInput, ModelError, TextGenerator, VisionExtractor};

/// Token budget for one vision extraction.
const VISION_MAX_TOKENS: i32 = 512;

/// Blocking HTTP client for a local Ollama instance (`/api/chat`).
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Non-streaming chat completion. `phase` names the call in timeout errors.
    pub fn chat(
        &self,
        phase: &'static str,
        model: &str,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<String, ModelError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model,
            messages,
            stream: false,
            options,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| ModelError::from_send(&e, &self.base_url, phase, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ModelError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| ModelError::ResponseParsing(e.to_string()))?;

        non_empty(parsed.message.content)
    }
}

/// Request body for Ollama `/api/chat`.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// Base64-encoded images (user messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ChatMessage {
    pub fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            images: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

fn non_empty(content: String) -> Result<String, ModelError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(ModelError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}

/// System prompt, history window, then the current user prompt.
pub fn build_chat_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(ChatMessage::text("system", &request.system_prompt));
    for turn in &request.history {
        messages.push(ChatMessage::text(turn.role.as_str(), &turn.content));
    }
    messages.push(ChatMessage::text("user", &request.user_prompt));
    messages
}

/// Text generation backed by an Ollama chat model.
#[derive(Debug, Clone)]
pub struct OllamaTextGenerator {
    client: OllamaClient,
    model: String,
}

impl OllamaTextGenerator {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for OllamaTextGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let options = ChatOptions {
            temperature: request.temperature,
            num_predict: i32::try_from(request.max_tokens).unwrap_or(i32::MAX),
        };
        self.client
            .chat("llm", &self.model, build_chat_messages(request), options)
    }
}

/// Vision extraction backed by an Ollama vision-language model.
#[derive(Debug, Clone)]
pub struct OllamaVisionExtractor {
    client: OllamaClient,
    model: String,
}

impl OllamaVisionExtractor {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

impl VisionExtractor for OllamaVisionExtractor {
    fn analyze_image(&self, image: &MediaInput, instruction: &str) -> Result<String, ModelError> {
        if image.is_empty() {
            return Err(ModelError::Image("Empty image upload".into()));
        }
        let message = ChatMessage {
            role: "user".to_string(),
            content: instruction.to_string(),
            images: Some(vec![base64::engine::general_purpose::STANDARD.encode(&image.bytes)]),
        };
        let options = ChatOptions {
            temperature: 0.0,
            num_predict: VISION_MAX_TOKENS,
        };
        tracing::debug!(model = %self.model, image_bytes = image.len(), "Vision extraction request");
        self.client.chat("vlm", &self.model, vec![message], options)
    }
}
