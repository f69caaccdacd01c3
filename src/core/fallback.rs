//! Sequential model fallback
//!
//! Candidates are tried in order, each at most once, with no delay between
//! attempts. The first successful completion wins.

use serde::Serialize;

use crate::providers::{ChatProvider, CompletionRequest, ProviderError};

/// Build the ordered candidate list: the requested model first, then the
/// configured fallbacks. Blank entries and repeats are dropped.
pub fn candidate_models(requested: Option<&str>, fallbacks: &[String]) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::with_capacity(fallbacks.len() + 1);

    for model in requested.into_iter().chain(fallbacks.iter().map(String::as_str)) {
        let model = model.trim();
        if model.is_empty() || candidates.iter().any(|c| c == model) {
            continue;
        }
        candidates.push(model.to_string());
    }

    candidates
}

/// Result of a successful fallback run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackReply {
    pub content: String,
    pub model: String,
}

/// Try `candidates` in order against `provider`.
///
/// `request.model` is overwritten for each attempt. On exhaustion the last
/// error is returned; `None` means there was nothing to try.
pub async fn first_success(
    provider: &dyn ChatProvider,
    mut request: CompletionRequest,
    candidates: &[String],
) -> Result<FallbackReply, Option<ProviderError>> {
    let mut last_error = None;

    for model in candidates {
        request.model.clone_from(model);

        match provider.complete(&request).await {
            Ok(content) => {
                tracing::debug!(model = %model, "completion served");
                return Ok(FallbackReply {
                    content,
                    model: model.clone(),
                });
            }
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "candidate model failed, trying next");
                last_error = Some(e);
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use crate::providers::testing::FakeProvider;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: String::new(),
            messages: vec![Message::system("sys"), Message::user("hi")],
            temperature: 0.3,
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_candidates_put_requested_first() {
        let candidates = candidate_models(Some("m0"), &models(&["m1", "m2"]));
        assert_eq!(candidates, models(&["m0", "m1", "m2"]));
    }

    #[test]
    fn test_candidates_drop_blank_and_repeats() {
        let candidates = candidate_models(Some(""), &models(&["m1", " ", "m1", "m2"]));
        assert_eq!(candidates, models(&["m1", "m2"]));

        let candidates = candidate_models(Some("m2"), &models(&["m1", "m2"]));
        assert_eq!(candidates, models(&["m2", "m1"]));
    }

    #[tokio::test]
    async fn test_tries_in_order_until_success() {
        let provider = FakeProvider::serving(&["m2"]);
        let reply = first_success(&provider, request(), &models(&["m0", "m1", "m2"]))
            .await
            .unwrap();

        assert_eq!(reply.model, "m2");
        assert_eq!(reply.content, "answer from m2");
        assert_eq!(provider.attempted_models(), models(&["m0", "m1", "m2"]));
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let provider = FakeProvider::serving(&["m0", "m1"]);
        let reply = first_success(&provider, request(), &models(&["m0", "m1"]))
            .await
            .unwrap();

        assert_eq!(reply.model, "m0");
        assert_eq!(provider.attempted_models(), models(&["m0"]));
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let provider = FakeProvider::serving(&[]);
        let err = first_success(&provider, request(), &models(&["m0", "m1"]))
            .await
            .unwrap_err();

        assert_eq!(err.unwrap().to_string(), "m1 unavailable");
        assert_eq!(provider.attempted_models(), models(&["m0", "m1"]));
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let provider = FakeProvider::serving(&["m0"]);
        let err = first_success(&provider, request(), &[]).await.unwrap_err();
        assert!(err.is_none());
        assert!(provider.attempted_models().is_empty());
    }
}
