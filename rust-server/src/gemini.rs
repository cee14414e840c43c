//! Gemini reply generation client.
//!
//! Thin adapter over the `generateContent` REST endpoint. Every request
//! carries the same two priming turns ahead of the user's message, so the
//! model answers as a WhatsApp assistant without any per-conversation
//! state.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::reply::{GenerateError, ReplyGenerator};

/// Priming instruction sent as the first (user) turn.
const PRIMING_INSTRUCTION: &str = "You are a helpful assistant replying to WhatsApp messages. \
     Keep answers short, friendly, and in the language of the incoming message.";

/// Fixed acknowledgment sent as the second (model) turn.
const PRIMING_ACK: &str =
    "Understood. I will reply briefly and helpfully to each message.";

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client with the given credential, model, and API base URL.
    ///
    /// `http` is the shared HTTP client; its timeout applies to every call.
    pub fn new(http: Client, api_key: String, model: String, base_url: String) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url,
        }
    }

    /// Build the request contents: the two priming turns plus the prompt.
    fn contents(prompt: &str) -> Vec<Content> {
        vec![
            Content::user(PRIMING_INSTRUCTION),
            Content::model(PRIMING_ACK),
            Content::user(prompt),
        ]
    }
}

#[async_trait]
impl ReplyGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let request = GenerateContentRequest {
            contents: Self::contents(prompt),
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body: GenerateContentResponse = response.json().await?;

        let text = body
            .first_text()
            .ok_or(GenerateError::EmptyResponse)?
            .to_string();

        info!(
            model = %self.model,
            prompt_length = prompt.len(),
            reply_length = text.len(),
            "gemini_generate_complete"
        );

        Ok(text)
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// First text part of the first candidate, if any.
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()
            .map(|p| p.text.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}
