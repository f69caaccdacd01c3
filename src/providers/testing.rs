//! In-memory provider for unit tests

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatProvider, CompletionRequest, DeltaStream, ProviderError};

/// Replays scripted upstream behaviour and records every call.
#[derive(Default)]
pub(crate) struct FakeProvider {
    /// Items yielded by `stream`, in order; `Err` ends the stream
    pub deltas: Vec<Result<String, String>>,
    /// Makes `stream` fail before any delta
    pub open_error: Option<String>,
    /// Models for which `complete` succeeds
    pub good_models: Vec<String>,
    /// `None` makes `list_models` fail
    pub models: Option<Vec<String>>,
    pub calls: Mutex<Vec<CompletionRequest>>,
}

impl FakeProvider {
    pub fn streaming(deltas: &[&str]) -> Self {
        Self {
            deltas: deltas.iter().map(|d| Ok(d.to_string())).collect(),
            ..Self::default()
        }
    }

    pub fn serving(models: &[&str]) -> Self {
        Self {
            good_models: models.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn attempted_models(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.model.clone())
            .collect()
    }

    fn record(&self, request: &CompletionRequest) {
        self.calls.lock().unwrap().push(request.clone());
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.record(request);
        if self.good_models.contains(&request.model) {
            Ok(format!("answer from {}", request.model))
        } else {
            Err(ProviderError::Api {
                status: 404,
                message: format!("{} unavailable", request.model),
            })
        }
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream, ProviderError> {
        self.record(request);
        if let Some(message) = &self.open_error {
            return Err(ProviderError::Api {
                status: 401,
                message: message.clone(),
            });
        }

        let mut items = Vec::new();
        for delta in &self.deltas {
            match delta {
                Ok(text) => items.push(Ok(text.clone())),
                Err(message) => {
                    items.push(Err(ProviderError::Stream(message.clone())));
                    break;
                }
            }
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        self.models
            .clone()
            .ok_or_else(|| ProviderError::InvalidResponse("model list failed".to_string()))
    }
}
