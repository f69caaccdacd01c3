//! Server-side chat pipeline
//!
//! Validation, streamed completions and the sequential model fallback.

mod chat;
pub mod fallback;

pub use chat::{Capabilities, ChatEngine, ChatError, ChatRequest};
pub use fallback::FallbackReply;
