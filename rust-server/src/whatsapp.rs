//! WhatsApp Cloud API send client.
//!
//! Thin adapter over the Graph API `/{phone_number_id}/messages` endpoint.
//! Replies carry a `context.message_id` block so the platform renders them
//! as quoted replies to the originating message.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::reply::{ReplySender, SendError};

/// Client for sending messages through the WhatsApp Cloud API.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: Client,
    access_token: String,
    phone_number_id: String,
    base_url: String,
}

impl WhatsAppClient {
    /// Create a client for the given sending number.
    ///
    /// `base_url` includes the Graph API version segment,
    /// e.g. `https://graph.facebook.com/v19.0`.
    pub fn new(
        http: Client,
        access_token: String,
        phone_number_id: String,
        base_url: String,
    ) -> Self {
        Self {
            http,
            access_token,
            phone_number_id,
            base_url,
        }
    }
}

#[async_trait]
impl ReplySender for WhatsAppClient {
    async fn send_text_reply(
        &self,
        to: &str,
        body: &str,
        quoted_message_id: &str,
    ) -> Result<(), SendError> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);

        let request = SendMessageRequest::text_reply(to, body, quoted_message_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        // Response body is not consumed beyond the status
        info!(
            to = %to,
            quoted_message_id = %quoted_message_id,
            body_length = body.len(),
            "whatsapp_send_complete"
        );

        Ok(())
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendMessageRequest {
    messaging_product: &'static str,
    to: String,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextPayload,
    context: ReplyContext,
}

#[derive(Debug, Serialize)]
struct TextPayload {
    preview_url: bool,
    body: String,
}

/// Marks the outgoing message as a quoted reply.
#[derive(Debug, Serialize)]
struct ReplyContext {
    message_id: String,
}

impl SendMessageRequest {
    fn text_reply(to: &str, body: &str, quoted_message_id: &str) -> Self {
        Self {
            messaging_product: "whatsapp",
            to: to.to_string(),
            kind: "text",
            text: TextPayload {
                preview_url: false,
                body: body.to_string(),
            },
            context: ReplyContext {
                message_id: quoted_message_id.to_string(),
            },
        }
    }
}
