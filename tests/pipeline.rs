//! End to end: real server on a loopback port, real HTTP client session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use tomoni_chat::client::{ChatSession, ChatView, HttpTransport, SendOutcome, SessionSettings};
use tomoni_chat::config::{Config, FileConfig};
use tomoni_chat::conversation::{Message, Role};
use tomoni_chat::core::ChatEngine;
use tomoni_chat::providers::{ChatProvider, CompletionRequest, DeltaStream, ProviderError};
use tomoni_chat::{routes, AppState};

/// Streams fixed deltas with a small pause between them.
struct SlowProvider {
    deltas: Vec<&'static str>,
    fail_after: Option<usize>,
}

#[async_trait]
impl ChatProvider for SlowProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        Ok(format!("{} via {}", self.deltas.concat(), request.model))
    }

    async fn stream(&self, _request: &CompletionRequest) -> Result<DeltaStream, ProviderError> {
        let deltas = self.deltas.clone();
        let fail_after = self.fail_after;

        Ok(Box::pin(async_stream::stream! {
            for (i, delta) in deltas.into_iter().enumerate() {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if fail_after == Some(i) {
                    yield Err(ProviderError::Stream("upstream went away".to_string()));
                    return;
                }
                yield Ok(delta.to_string());
            }
        }))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["llama-3.1-8b-instant".to_string()])
    }
}

/// Counts renders.
#[derive(Clone, Default)]
struct Frames(Arc<Mutex<usize>>);

impl Frames {
    fn count(&self) -> usize {
        *self.0.lock().unwrap()
    }
}

impl ChatView for Frames {
    fn render(&self, _messages: &[Message]) {
        *self.0.lock().unwrap() += 1;
    }
}

async fn spawn_server(provider: SlowProvider, with_key: bool) -> String {
    let config = Config::from_sources(FileConfig::default(), |key| {
        (with_key && key == "GROQ_API_KEY").then(|| "gsk_test".to_string())
    })
    .unwrap();

    let state = AppState {
        engine: Arc::new(ChatEngine::new(config, Arc::new(provider))),
    };
    let app = routes::router().with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn session(server: &str, frames: Frames) -> ChatSession<HttpTransport, Frames> {
    let transport = HttpTransport::new(server).unwrap();
    ChatSession::new(transport, frames, SessionSettings::default())
}

#[tokio::test]
async fn streamed_reply_is_reassembled_in_order() {
    let server = spawn_server(
        SlowProvider {
            deltas: vec!["こ", "んにちは", "\n", "안녕", "하세요"],
            fail_after: None,
        },
        true,
    )
    .await;
    let frames = Frames::default();
    let session = session(&server, frames.clone());
    let before = session.messages().await.len();

    assert_eq!(session.submit("hello").await, SendOutcome::Completed);

    let messages = session.messages().await;
    assert_eq!(messages.len(), before + 2);
    assert_eq!(messages[before + 1], Message::assistant("こんにちは\n안녕하세요"));
    // user turn, placeholder, and at least one frame per network read
    assert!(frames.count() >= 3);
}

#[tokio::test]
async fn missing_key_surfaces_error_without_placeholder() {
    let server = spawn_server(
        SlowProvider {
            deltas: vec!["never"],
            fail_after: None,
        },
        false,
    )
    .await;
    let session = session(&server, Frames::default());
    let before = session.messages().await.len();

    assert_eq!(session.submit("hello").await, SendOutcome::Failed);

    let messages = session.messages().await;
    assert_eq!(messages.len(), before + 2);
    let reply = messages.last().unwrap();
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(
        reply.content,
        "接続に失敗: GROQ_API_KEY missing\n연결 실패: GROQ_API_KEY missing"
    );
}

#[tokio::test]
async fn mid_stream_failure_is_reported_after_partial_text() {
    let server = spawn_server(
        SlowProvider {
            deltas: vec!["first ", "second ", "third"],
            fail_after: Some(2),
        },
        true,
    )
    .await;
    let session = session(&server, Frames::default());
    let before = session.messages().await.len();

    assert_eq!(session.submit("hello").await, SendOutcome::Failed);

    let messages = session.messages().await;
    assert_eq!(messages.len(), before + 3);
    assert_eq!(messages[before + 1], Message::assistant("first second "));
    assert!(messages[before + 2].content.starts_with("接続に失敗"));
    assert!(!session.is_busy().await);
}

#[tokio::test]
async fn raw_stream_response_is_plain_text() {
    let server = spawn_server(
        SlowProvider {
            deltas: vec!["He", "llo", "!"],
            fail_after: None,
        },
        true,
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/ai-chat/stream", server))
        .json(&serde_json::json!({
            "messages": [{ "role": "user", "content": "hello" }]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.headers()["x-accel-buffering"], "no");

    let mut body = response.bytes_stream();
    let mut text = Vec::new();
    while let Some(chunk) = body.next().await {
        text.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(String::from_utf8(text).unwrap(), "Hello!");
}
