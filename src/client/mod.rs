//! Client side of the chat stream
//!
//! A [`ChatSession`] owns one in-memory conversation. Each exchange appends
//! the user's turn, opens the stream, and grows a single assistant turn in
//! place as chunks arrive, re-rendering after every read. Failures become a
//! bilingual assistant message in the transcript.

mod decoder;
mod transport;

use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::prompts;
use crate::conversation::{Conversation, Message};
use crate::core::ChatRequest;

pub use decoder::{DecodeError, Utf8StreamDecoder};
pub use transport::{ByteStream, ChatTransport, HttpTransport, StreamResponse, STREAM_PATH};

pub const DEFAULT_CLIENT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_CLIENT_TEMPERATURE: f32 = 0.3;

const NO_STREAM_BODY: &str = "No stream body";

/// Errors that end an exchange. The Display text is shown to the user.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server refused the request; carries its error text.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Decode(#[from] DecodeError),
}

/// Receives the transcript whenever it changes.
pub trait ChatView: Send + Sync {
    fn render(&self, messages: &[Message]);
}

/// Generation parameters sent with every request
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub model: String,
    pub temperature: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_CLIENT_MODEL.to_string(),
            temperature: DEFAULT_CLIENT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// An exchange is already running; nothing happened
    Busy,
    /// The stream ran to completion
    Completed,
    /// An error message was appended to the transcript
    Failed,
}

struct SessionState {
    conversation: Conversation,
    input: String,
}

/// Clears the busy flag when the exchange ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct ChatSession<T, V> {
    transport: T,
    view: V,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    busy: AtomicBool,
}

impl<T: ChatTransport, V: ChatView> ChatSession<T, V> {
    /// Start with the Tomoni system instruction and greeting.
    pub fn new(transport: T, view: V, settings: SessionSettings) -> Self {
        let conversation = Conversation::new(prompts::SYSTEM).with_greeting(prompts::GREETING);
        Self::with_conversation(transport, view, settings, conversation)
    }

    pub fn with_conversation(
        transport: T,
        view: V,
        settings: SessionSettings,
        conversation: Conversation,
    ) -> Self {
        Self {
            transport,
            view,
            settings,
            state: Mutex::new(SessionState {
                conversation,
                input: String::new(),
            }),
            busy: AtomicBool::new(false),
        }
    }

    pub async fn set_input(&self, text: &str) {
        let mut state = self.state.lock().await;
        state.input.clear();
        state.input.push_str(text);
    }

    /// Add dictated text to the draft, space-separated from what is there.
    pub async fn append_transcript(&self, transcript: &str) {
        let mut state = self.state.lock().await;
        if !state.input.is_empty() {
            state.input.push(' ');
        }
        state.input.push_str(transcript);
    }

    pub async fn input(&self) -> String {
        self.state.lock().await.input.clone()
    }

    pub async fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.conversation.messages().to_vec()
    }

    /// Set the draft and send it.
    pub async fn submit(&self, text: &str) -> SendOutcome {
        self.set_input(text).await;
        self.send().await
    }

    /// Send the current draft and stream the reply into the transcript.
    pub async fn send(&self) -> SendOutcome {
        let (request, _busy) = {
            let mut state = self.state.lock().await;
            let content = state.input.trim().to_string();
            if content.is_empty() {
                return SendOutcome::Ignored;
            }
            if self
                .busy
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return SendOutcome::Busy;
            }
            let guard = BusyGuard(&self.busy);

            state.conversation.add_user(&content);
            state.input.clear();
            self.view.render(state.conversation.messages());

            let request = ChatRequest {
                messages: state.conversation.messages().to_vec(),
                model: Some(self.settings.model.clone()),
                temperature: Some(self.settings.temperature),
            };
            (request, guard)
        };

        let outcome = match self.exchange(&request).await {
            Ok(()) => SendOutcome::Completed,
            Err(e) => {
                tracing::warn!(error = %e, "chat exchange failed");
                let mut state = self.state.lock().await;
                state
                    .conversation
                    .add_assistant(&prompts::connection_failed(&e.to_string()));
                self.view.render(state.conversation.messages());
                SendOutcome::Failed
            }
        };

        outcome
    }

    async fn exchange(&self, request: &ChatRequest) -> Result<(), ClientError> {
        let response = self.transport.open(request).await?;
        let success = response.is_success();
        let StreamResponse { reason, body, .. } = response;

        let mut body = match body {
            Some(body) if success => body,
            body => return Err(rejection(success, reason, body).await),
        };

        {
            let mut state = self.state.lock().await;
            state.conversation.add_placeholder();
            self.view.render(state.conversation.messages());
        }

        let mut decoder = Utf8StreamDecoder::new();
        let mut accumulated = String::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            accumulated.push_str(&decoder.decode(&chunk)?);

            let mut state = self.state.lock().await;
            state.conversation.replace_last_assistant(&accumulated);
            self.view.render(state.conversation.messages());
        }

        decoder.finish()?;
        tracing::debug!(chars = accumulated.chars().count(), "assistant turn complete");
        Ok(())
    }
}

/// Work out what to tell the user about a refused or bodiless response.
async fn rejection(success: bool, reason: String, body: Option<ByteStream>) -> ClientError {
    let mut detail = if success { String::new() } else { reason };

    if let Some(mut body) = body {
        let mut raw = Vec::new();
        while let Some(Ok(chunk)) = body.next().await {
            raw.extend_from_slice(&chunk);
        }
        if let Ok(ErrorBody { error: Some(error) }) = serde_json::from_slice::<ErrorBody>(&raw) {
            if !error.is_empty() {
                detail = error;
            }
        }
    }

    if detail.is_empty() {
        detail = NO_STREAM_BODY.to_string();
    }
    ClientError::Rejected(detail)
}
