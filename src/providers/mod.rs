//! AI provider integrations

mod groq;
#[cfg(test)]
pub(crate) mod testing;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::conversation::Message;

pub use groq::{GroqConfig, GroqProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with an error; the message is reported verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Stream interrupted: {0}")]
    Stream(String),
}

/// Incremental text deltas, in upstream order.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// One completion call against a single model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
}

/// A hosted chat-completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Non-streaming completion; returns the first choice's text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    /// Streaming completion. Resolves once the upstream has accepted the
    /// request; the returned stream then yields non-empty deltas.
    async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream, ProviderError>;

    /// Model identifiers the credential can use.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;
}
