//! Chat engine
//!
//! The ChatEngine sits between the HTTP routes and the upstream provider:
//! 1. Validates the credential and the incoming conversation
//! 2. Resolves model and temperature defaults
//! 3. Opens a streamed completion, holding the response back until the
//!    upstream has produced its first delta (or failed)
//! 4. Runs the sequential model fallback for non-streaming requests

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::conversation::Message;
use crate::providers::{ChatProvider, CompletionRequest, DeltaStream, ProviderError};

use super::fallback::{self, FallbackReply};

/// Body accepted by both chat endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,

    /// Model to use; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Outcome of the capability check
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub ok: bool,
    pub has_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Errors from the chat engine
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Carries the full user-facing text, e.g. `GROQ_API_KEY missing`
    #[error("{0}")]
    MissingApiKey(String),

    #[error("invalid messages")]
    InvalidMessages,

    #[error("no candidate models configured")]
    NoCandidates,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub struct ChatEngine {
    config: Config,
    provider: Arc<dyn ChatProvider>,
}

impl ChatEngine {
    pub fn new(config: Config, provider: Arc<dyn ChatProvider>) -> Self {
        Self { config, provider }
    }

    /// Credential first, then the message list. Neither touches the network.
    fn prepare(&self, request: ChatRequest) -> Result<CompletionRequest, ChatError> {
        if !self.config.has_api_key() {
            return Err(ChatError::MissingApiKey(self.config.missing_key_message()));
        }
        if request.messages.is_empty() {
            return Err(ChatError::InvalidMessages);
        }

        let model = request
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.config.default_model.clone());

        Ok(CompletionRequest {
            model,
            messages: request.messages,
            temperature: request.temperature.unwrap_or(self.config.temperature),
        })
    }

    /// Open a streamed completion.
    ///
    /// Resolves only after the upstream yielded its first item, so failures
    /// that happen before any text exists are reported as errors instead of
    /// an empty, broken stream.
    pub async fn stream(&self, request: ChatRequest) -> Result<DeltaStream, ChatError> {
        let request = self.prepare(request)?;
        tracing::info!(
            model = %request.model,
            messages = request.messages.len(),
            "opening chat stream"
        );

        let mut upstream = self.provider.stream(&request).await?;

        match upstream.next().await {
            Some(Ok(first)) => {
                let head = futures::stream::once(async move { Ok(first) });
                Ok(Box::pin(head.chain(upstream)))
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(Box::pin(futures::stream::empty())),
        }
    }

    /// Non-streaming completion over the requested model and the fallbacks.
    pub async fn complete(&self, request: ChatRequest) -> Result<FallbackReply, ChatError> {
        let requested = request.model.clone();
        let request = self.prepare(ChatRequest {
            model: None,
            ..request
        })?;

        let candidates =
            fallback::candidate_models(requested.as_deref(), &self.config.fallback_models);

        fallback::first_success(self.provider.as_ref(), request, &candidates)
            .await
            .map_err(|last| match last {
                Some(e) => {
                    tracing::error!(error = %e, "all candidate models failed");
                    ChatError::Provider(e)
                }
                None => ChatError::NoCandidates,
            })
    }

    pub async fn capabilities(&self) -> Capabilities {
        if !self.config.has_api_key() {
            return Capabilities {
                ok: false,
                has_key: false,
                models: None,
                error: None,
            };
        }

        match self.provider.list_models().await {
            Ok(mut models) => {
                models.sort();
                Capabilities {
                    ok: true,
                    has_key: true,
                    models: Some(models),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "model listing failed");
                Capabilities {
                    ok: false,
                    has_key: true,
                    models: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
