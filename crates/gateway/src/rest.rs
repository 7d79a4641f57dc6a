//! REST routes: liveness and the queue ingress.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::debug;

use crate::error::GatewayError;
use crate::state::GatewayState;

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Ordered history of a group's direct-send messages, for reconnect/replay.
/// Unknown groups answer with an empty list.
pub async fn group_history(
    State(state): State<Arc<GatewayState>>,
    Path(group): Path<String>,
) -> impl IntoResponse {
    Json(state.history.read(&group).await)
}

/// Accept an opaque message payload and hand it to the enrichment queue.
///
/// The body is not validated here beyond being non-empty; the pipeline owns
/// decoding and emits the diagnostic broadcast for malformed payloads. A full
/// queue surfaces as 503 backpressure rather than buffering without bound.
pub async fn enqueue_message(
    State(state): State<Arc<GatewayState>>,
    body: String,
) -> Result<StatusCode, GatewayError> {
    if body.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "message body must not be empty".to_string(),
        ));
    }

    debug!(bytes = body.len(), "enqueueing inbound message");
    state.queue.try_publish(body)?;
    Ok(StatusCode::ACCEPTED)
}
