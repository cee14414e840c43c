//! Web server module for the inbound webhook endpoints.
//!
//! Exposes:
//! - `GET /health`: liveness check
//! - `GET /webhook`: Meta's verification handshake
//! - `POST /webhook`: signed event ingestion
//!
//! Signature verification runs against the raw request body before any
//! parsing; see [`signature`].

pub mod handlers;
pub mod signature;

use axum::{
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, receive_webhook, verify_webhook, AppState, HealthResponse, VerifyQuery,
    WebhookResponse,
};
pub use signature::verify_signature;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
