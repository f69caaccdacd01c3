//! Tomoni Chat - streaming AI chat for the Tomoni community app
//!
//! The server half forwards a conversation to a hosted OpenAI-compatible
//! model API (Groq) and relays the reply as plain incremental text. The
//! client half reads that text back into a growing assistant message.

use std::sync::Arc;

pub mod client;
pub mod config;
pub mod conversation;
pub mod core;
pub mod providers;
pub mod routes;

use crate::core::ChatEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
}
