//! Replybot - WhatsApp webhook service with AI-generated replies.
//!
//! This library backs the `replybot-web` binary: a web server that
//! receives signed WhatsApp Business webhook events, generates a reply
//! per inbound text message, and sends it back as a quoted reply.
//!
//! ## Architecture
//!
//! ```text
//! Meta webhook → Signature Verifier → Event Parser → per message:
//!   Gemini (generate) → WhatsApp Cloud API (send quoted reply)
//! ```
//!
//! Nothing is stored across requests; configuration is loaded once at
//! startup and the two outbound collaborators sit behind traits so tests
//! substitute mocks.

pub mod config;
pub mod event;
pub mod gemini;
pub mod reply;
pub mod web;
pub mod whatsapp;

// Re-export commonly used types
pub use config::Config;
pub use event::{extract_text_messages, TextMessage, WebhookPayload};
pub use gemini::GeminiClient;
pub use reply::{deliver_replies, BatchOutcome, ReplyGenerator, ReplySender, FALLBACK_REPLY};
pub use web::AppState;
pub use whatsapp::WhatsAppClient;
