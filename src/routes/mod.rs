//! API routes

use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderName, StatusCode,
    },
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use serde::Serialize;
use serde_json::json;

use crate::core::{ChatError, ChatRequest, FallbackReply};
use crate::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Failures answered as `{ "error": "..." }`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Chat(ChatError),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError::Chat(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Chat(ChatError::InvalidMessages) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Chat(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Chat(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "chat request failed");
        } else {
            tracing::debug!(status = %status, error = %message, "chat request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Capability check: key presence and the models it can reach.
async fn capabilities(State(state): State<AppState>) -> Response {
    let capabilities = state.engine.capabilities().await;
    let status = if capabilities.ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(capabilities)).into_response()
}

/// Non-streaming completion with model fallback.
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<FallbackReply>, ApiError> {
    let Json(request) = payload?;
    let reply = state.engine.complete(request).await?;
    Ok(Json(reply))
}

/// Streamed completion as unframed UTF-8 text.
///
/// Deltas are written as they arrive. An upstream failure after the first
/// delta aborts the body; there is no in-band error marker.
async fn chat_stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let deltas = state.engine.stream(request).await?;

    let body = Body::from_stream(deltas.map(|item| match item {
        Ok(text) => Ok(Bytes::from(text)),
        Err(e) => {
            tracing::error!(error = %e, "chat stream aborted mid-response");
            Err(e)
        }
    }));

    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, "no-cache, no-transform"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        body,
    )
        .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/ai-chat", get(capabilities).post(chat))
        .route("/api/ai-chat/stream", post(chat_stream))
}
