//! Client for OpenAI-compatible HTTP APIs.
//!
//! Works against any server exposing `/chat/completions` and `/embeddings`
//! in the OpenAI wire format: OpenAI itself, OpenRouter, Ollama, vLLM,
//! llama.cpp server. One client serves as both the pipeline's
//! [`GenerationBackend`] and (optionally) its [`Embedder`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embed::DEFAULT_MAX_INPUT_CHARS;
use crate::traits::{Embedder, GenerationBackend, validate_embed_input};
use crate::types::{Embedding, FinishReason, GenerateOptions, GenerateResponse, Message, Usage};
use crate::{HuginnError, Result};

/// Default base URL (OpenAI).
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    embedding_model: String,
    max_input_chars: usize,
}

impl std::fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl OpenAiCompatClient {
    /// Client for `base_url` (e.g. `http://localhost:11434/v1`) with a 60s
    /// request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            HuginnError::Configuration(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Model used by [`Embedder::embed`].
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Longest text accepted by [`Embedder::embed`], in characters.
    pub fn max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> reqwest::Result<Response> {
        let mut request = self.http.post(format!("{}{}", self.base_url, path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request.send().await
    }
}

/// Map a non-2xx response to an error.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(HuginnError::AuthenticationFailed),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(HuginnError::RateLimited { retry_after })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            Err(HuginnError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl Embedder for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        validate_embed_input(text, self.max_input_chars)?;

        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response = self
            .post("/embeddings", &request)
            .await
            .map_err(|e| HuginnError::EmbeddingServiceUnavailable(e.to_string()))?;

        let response = match check_status(response).await {
            Err(HuginnError::Api { status, message }) if status >= 500 => {
                return Err(HuginnError::EmbeddingServiceUnavailable(format!(
                    "{status}: {message}"
                )));
            }
            other => other?,
        };

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;
        let values = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or(HuginnError::EmptyResponse)?;

        Ok(Embedding::new(values, self.embedding_model.clone()))
    }
}

#[async_trait]
impl GenerationBackend for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<GenerateResponse> {
        let request = ChatRequest {
            model: &options.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };
        debug!(model = %options.model, messages = messages.len(), "chat completion request");

        let response = self
            .post("/chat/completions", &request)
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;
        let response = check_status(response).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;
        let choice = body.choices.into_iter().next().ok_or(HuginnError::EmptyResponse)?;
        let text = choice.message.content.unwrap_or_default();

        Ok(GenerateResponse {
            text,
            usage: body.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: body.model,
            finish_reason: match choice.finish_reason.as_deref() {
                Some("length") => FinishReason::Length,
                Some("content_filter") => FinishReason::ContentFilter,
                _ => FinishReason::Stop,
            },
        })
    }
}

// Wire types

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = OpenAiCompatClient::new("http://localhost:11434/v1/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn debug_redacts_key() {
        let client = OpenAiCompatClient::new(DEFAULT_BASE_URL)
            .unwrap()
            .api_key("sk-secret");
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn chat_request_omits_unset_fields() {
        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: None,
            temperature: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
