//! # Relaycast Gateway Crate
//!
//! The HTTP/WebSocket edge of the relay: per-connection chat sessions over
//! WebSocket, the REST ingress endpoint that feeds the enrichment queue, and
//! the router that ties them together.

pub mod error;
pub mod rest;
pub mod session;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use session::{ChatSession, SessionError};
pub use state::GatewayState;

use std::sync::Arc;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the application router with all routes.
pub fn create_router(state: GatewayState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/health", get(rest::health))
        .route("/api/messages", post(rest::enqueue_message))
        .route("/api/groups/:group/history", get(rest::group_history))
        .route("/ws/chat", get(websocket::chat_websocket_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any),
        )
}
