//! How a session reaches the streaming endpoint

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;

use crate::core::ChatRequest;

use super::ClientError;

/// Path of the streaming endpoint relative to the server root
pub const STREAM_PATH: &str = "/api/ai-chat/stream";

/// Raw body reads, in wire order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Response head plus the unread body
pub struct StreamResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`, may be empty
    pub reason: String,
    pub body: Option<ByteStream>,
}

impl StreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the request and resolve once response headers are in.
    async fn open(&self, request: &ChatRequest) -> Result<StreamResponse, ClientError>;
}

/// `reqwest` transport posting JSON to a Tomoni server
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", server_url.trim_end_matches('/'), STREAM_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest) -> Result<StreamResponse, ClientError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        let body: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(ClientError::from)),
        );

        Ok(StreamResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: Some(body),
        })
    }
}
