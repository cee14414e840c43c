//! Reply orchestration.
//!
//! For each extracted text message, sequentially: ask the generation
//! collaborator for a reply, then send it back as a quoted reply to the
//! originating message. Collaborator failures are absorbed here. A failed
//! generation falls back to a fixed message; a failed send is logged and
//! dropped. One message can never fail the batch or the HTTP request.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::event::TextMessage;

/// Reply used when the generation collaborator fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't process your message right now. Please try again later.";

/// Generation collaborator failure.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation API returned no candidates")]
    EmptyResponse,
}

/// Send collaborator failure.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("send API returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Generates a reply for an inbound message text.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

/// Sends a reply text back to the platform, quoting the original message.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_text_reply(
        &self,
        to: &str,
        body: &str,
        quoted_message_id: &str,
    ) -> Result<(), SendError>;
}

/// Counters for one processed webhook delivery.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Text messages processed
    pub messages: usize,
    /// Replies that used the fallback text
    pub fallbacks: usize,
    /// Sends that failed (logged and dropped)
    pub send_failures: usize,
}

/// Generate and send a reply for each message, strictly in order.
///
/// One message's generate and send complete before the next message
/// starts. Failures are isolated per message.
pub async fn deliver_replies(
    generator: &dyn ReplyGenerator,
    sender: &dyn ReplySender,
    messages: impl Iterator<Item = TextMessage>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for message in messages {
        outcome.messages += 1;

        info!(
            from = %message.from,
            message_id = %message.id,
            body_length = message.body.len(),
            "reply_message_start"
        );

        let reply = match generator.generate(&message.body).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    error = %e,
                    "reply_generation_failed_using_fallback"
                );
                outcome.fallbacks += 1;
                FALLBACK_REPLY.to_string()
            }
        };

        // Send failures are dropped here on purpose; they never propagate
        if let Err(e) = sender
            .send_text_reply(&message.from, &reply, &message.id)
            .await
        {
            error!(
                to = %message.from,
                message_id = %message.id,
                error = %e,
                "reply_send_failed"
            );
            outcome.send_failures += 1;
        }
    }

    outcome
}
