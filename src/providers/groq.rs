//! Groq provider (OpenAI-compatible chat completions)
//!
//! Talks to any API implementing the OpenAI chat completions format; the
//! defaults point at Groq.
//!
//! Streaming replies arrive as Server-Sent Events:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"He"}}]}
//!
//! data: {"choices":[{"delta":{"content":"llo"}}]}
//!
//! data: [DONE]
//! ```

use std::fmt::Display;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Config, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::conversation::Message;

use super::{ChatProvider, CompletionRequest, DeltaStream, ProviderError};

const DONE_MARKER: &str = "[DONE]";

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    stream: bool,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ContentPart>,
}

/// One streamed `chat.completion.chunk`
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ContentPart>,
    #[serde(default)]
    message: Option<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionChunk {
    /// Incremental text, falling back to a full message when the chunk
    /// carries no delta content.
    fn text(self) -> Option<String> {
        let choice = self.choices.into_iter().next()?;
        choice
            .delta
            .and_then(|d| d.content)
            .or_else(|| choice.message.and_then(|m| m.content))
    }
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Groq provider configuration
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// Base URL for the API (e.g., https://api.groq.com/openai/v1)
    pub base_url: String,
    /// API key; requests are refused locally when absent
    pub api_key: Option<String>,
    /// Connection timeout in seconds. Reading a reply is never timed out.
    pub timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl From<&Config> for GroqConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

pub struct GroqProvider {
    config: GroqConfig,
    client: Client,
}

impl GroqProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: GroqConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("missing API key".to_string()))?;
        Ok(builder.bearer_auth(api_key))
    }

    async fn send_completion(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<Response, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            stream,
        };

        let response = self
            .authorized(self.client.post(&url))?
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for GroqProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let response = self.send_completion(request, false).await?;
        let body = response.text().await?;

        let completion: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {} - Body: {}", e, body))
        })?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream, ProviderError> {
        let response = self.send_completion(request, true).await?;
        tracing::debug!(model = %request.model, "upstream stream opened");
        Ok(delta_stream(response.bytes_stream()))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.config.base_url);
        let response = self.authorized(self.client.get(&url))?.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let body: Value = response.json().await?;
        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }
}

/// Build an API error from a non-2xx body, preferring the upstream message.
fn api_error(status: u16, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => format!("HTTP {}: {}", status, body),
    };
    ProviderError::Api { status, message }
}

/// Interpret one SSE `data` payload.
///
/// `Ok(None)` means the event carried no text.
fn parse_event_data(data: &str) -> Result<Option<String>, ProviderError> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| ProviderError::InvalidResponse(format!("Bad stream chunk: {} - Data: {}", e, data)))?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream(error.message));
    }

    Ok(chunk.text().filter(|text| !text.is_empty()))
}

/// Turn an SSE byte stream into text deltas. The first failure ends it.
fn delta_stream<S, B, E>(bytes: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut events = Box::pin(bytes.eventsource());

    Box::pin(async_stream::stream! {
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(ProviderError::Stream(e.to_string()));
                    break;
                }
            };

            if event.data.trim() == DONE_MARKER {
                break;
            }

            match parse_event_data(&event.data) {
                Ok(Some(text)) => yield Ok(text),
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    })
}
