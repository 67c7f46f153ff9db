//! Chat relay endpoint
//!
//! Validates the incoming request, opens one streaming call to the
//! completion API, and pumps its output back to the client as SSE frames.
//! The 200 status is committed before any upstream result is known; once
//! streaming headers are out, the `error`/`done` framing inside the body is
//! what carries the outcome.

use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    proxy::ChatMessage,
    streaming::{self, ChunkParser},
    AppState,
};

/// Incoming chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far, forwarded upstream unchanged and in order
    pub messages: Option<Vec<ChatMessage>>,
}

/// Handle `POST /chat`
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Response> {
    let messages = request
        .messages
        .ok_or_else(|| AppError::BadRequest("missing messages".to_string()))?;

    info!(messages = messages.len(), "Relaying chat completion");

    let client = state.openai.clone();

    // One task, one upstream connection, one decoder. Events are written in
    // upstream read order; nothing is buffered past a single frame.
    let relay = stream! {
        let response = match client.stream_chat(&messages).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Upstream request failed");
                yield Ok::<_, Infallible>(streaming::format_relay_failure(&e.to_string()));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            match response.text().await {
                Ok(body) => {
                    warn!(status = %status, body = %body, "Upstream rejected completion request");
                    yield Ok(streaming::format_upstream_error(&body));
                }
                // Reading the rejection body is itself a step that can
                // fail; surface the failure, not an empty error body
                Err(e) => {
                    warn!(status = %status, error = %e, "Failed to read upstream error body");
                    yield Ok(streaming::format_relay_failure(&e.to_string()));
                }
            }
            return;
        }

        let mut parser = ChunkParser::new();
        let mut upstream = response.bytes_stream();

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in parser.feed(&bytes) {
                        yield Ok(streaming::format_event(&event));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Upstream stream failed mid-read");
                    yield Ok(streaming::format_relay_failure(&e.to_string()));
                    return;
                }
            }
        }

        // End-of-stream done, on top of any sentinel-triggered one
        yield Ok(streaming::format_done());
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(relay))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}
