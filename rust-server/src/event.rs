//! Webhook event payload model and text-message extraction.
//!
//! Meta delivers events as a nested tree:
//!
//! ```text
//! WebhookPayload → entry[] → changes[] → value → messages[]
//! ```
//!
//! Any level of the tree may be absent. A delivery with no entries, no
//! changes, or no messages (e.g. a status-only delivery) is a valid
//! zero-message event, not a malformed one, so every container field
//! defaults to empty on decode.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Top-level discriminator for WhatsApp Business Account events.
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";

/// Top-level webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Event object type; only `whatsapp_business_account` is handled
    #[serde(default)]
    pub object: String,
    /// Entries in delivery order
    #[serde(default)]
    pub entry: Vec<Entry>,
}

impl WebhookPayload {
    /// Whether this payload carries WhatsApp Business Account events.
    pub fn is_whatsapp_event(&self) -> bool {
        self.object == WHATSAPP_OBJECT
    }
}

/// One account-level entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// WhatsApp Business Account id
    #[serde(default)]
    pub id: String,
    /// Changes in delivery order
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// One change notification inside an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    /// Changed field, `messages` for inbound traffic
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

/// The value block of a change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Sender profiles for the messages below
    #[serde(default)]
    pub contacts: Vec<Contact>,
    /// Inbound messages in delivery order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Delivery/read receipts; carry no messages to act on
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

/// Receiving-number metadata attached to a change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub phone_number_id: String,
}

/// Sender profile block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: String,
}

/// One inbound message.
///
/// `from`, `id` and the text body are optional at the decode layer so a
/// malformed message node can be skipped individually instead of failing
/// the whole delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Sender phone number
    #[serde(default)]
    pub from: Option<String>,
    /// Platform message id (`wamid.…`), used for quoted replies
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Present when `kind` is `text`
    #[serde(default)]
    pub text: Option<TextBody>,
}

/// Message type tag. Only `text` messages are acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Sticker,
    Location,
    Reaction,
    #[serde(other)]
    #[default]
    Unknown,
}

/// Body of a text message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// A text message extracted from a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    /// Sender phone number (reply recipient)
    pub from: String,
    /// Message id to quote in the reply
    pub id: String,
    /// Message text
    pub body: String,
}

/// Walk a webhook payload and yield its text messages in delivery order.
///
/// The walk is pure and lazy; iterating twice re-computes the same
/// sequence. Non-`text` messages are skipped silently. A message node
/// that is present but missing `from`, `id`, or its text body is skipped
/// with a warning and the rest of the batch continues.
pub fn extract_text_messages(
    payload: &WebhookPayload,
) -> impl Iterator<Item = TextMessage> + '_ {
    payload
        .entry
        .iter()
        .flat_map(|entry| entry.changes.iter())
        .flat_map(|change| change.value.messages.iter())
        .filter_map(|message| {
            if message.kind != MessageKind::Text {
                return None;
            }

            match (&message.from, &message.id, &message.text) {
                (Some(from), Some(id), Some(text)) => Some(TextMessage {
                    from: from.clone(),
                    id: id.clone(),
                    body: text.body.clone(),
                }),
                _ => {
                    warn!(
                        has_from = message.from.is_some(),
                        has_id = message.id.is_some(),
                        has_text = message.text.is_some(),
                        "text_message_malformed_skipped"
                    );
                    None
                }
            }
        })
}
