//! OpenAI-compatible chat completion backend
//!
//! Works against any server exposing `/chat/completions` (vLLM, Ollama,
//! OpenAI). The completion is fetched in one response and surfaced as a
//! single-chunk stream.

use super::{ChunkStream, GenerationBackend};
use crate::error::GenerationError;
use crate::request::GenerationRequest;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

/// HTTP backend for OpenAI-style chat APIs
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleBackend {
    /// Backend for `base_url` (e.g. `http://localhost:11434/v1`) and `model`
    ///
    /// # Errors
    ///
    /// [`GenerationError::Network`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, GenerationError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn body(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.instruction.clone(),
        });
        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[async_trait]
impl GenerationBackend for OpenAiCompatibleBackend {
    fn id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ChunkStream, GenerationError> {
        let mut http = self.client.post(self.chat_completions_url());
        if let Some(key) = &self.api_key {
            http = http.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = http.json(&self.body(request)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend(format!("HTTP {status}: {body}")));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        tracing::debug!("{} returned {} chars", self.model, content.len());

        Ok(stream::once(async move { Ok(content) }).boxed())
    }
}
