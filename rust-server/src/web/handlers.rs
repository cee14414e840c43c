//! Webhook endpoint handlers.
//!
//! Two logical routes plus a health check:
//! - `GET /webhook`: Meta's verification handshake (echo the challenge)
//! - `POST /webhook`: inbound event ingestion
//!
//! Ingestion order is a hard invariant: the signature is verified over the
//! raw body bytes first; an unverified request is never parsed and never
//! reaches the collaborators.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::event::{extract_text_messages, WebhookPayload};
use crate::reply::{self, ReplyGenerator, ReplySender};
use crate::web::signature::verify_signature;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub generator: Arc<dyn ReplyGenerator>,
    pub sender: Arc<dyn ReplySender>,
}

impl AppState {
    pub fn new(
        config: Config,
        generator: Arc<dyn ReplyGenerator>,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            generator,
            sender,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Verification Handshake
// =============================================================================

/// Query parameters of Meta's GET verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Verification handshake endpoint.
///
/// Echoes the challenge iff the mode is `subscribe` and the token matches
/// the configured verify token; anything else is a generic 403.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> impl IntoResponse {
    if query.mode.as_deref() == Some("subscribe")
        && query.verify_token.as_deref() == Some(state.config.verify_token.as_str())
    {
        info!("webhook_verified");
        return (StatusCode::OK, query.challenge.unwrap_or_default());
    }

    warn!(
        mode = ?query.mode,
        has_token = query.verify_token.is_some(),
        "webhook_verification_rejected"
    );
    (StatusCode::FORBIDDEN, String::new())
}

// =============================================================================
// Event Ingestion
// =============================================================================

/// Webhook response.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// Inbound event endpoint.
///
/// 1. Verifies the `X-Hub-Signature-256` header over the raw body
/// 2. Decodes the payload and checks the event-object type
/// 3. Generates and sends a reply per text message, sequentially
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());

    if !verify_signature(&state.config.app_secret, &body, signature) {
        warn!(body_length = body.len(), "webhook_signature_rejected");
        return (
            StatusCode::FORBIDDEN,
            Json(WebhookResponse {
                status: "forbidden",
            }),
        );
    }

    // The signature was computed over these exact bytes; decode the same buffer
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, body_length = body.len(), "webhook_payload_decode_failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookResponse { status: "error" }),
            );
        }
    };

    if !payload.is_whatsapp_event() {
        warn!(object = %payload.object, "webhook_object_unrecognized");
        return (
            StatusCode::NOT_FOUND,
            Json(WebhookResponse {
                status: "unknown_object",
            }),
        );
    }

    let outcome = reply::deliver_replies(
        state.generator.as_ref(),
        state.sender.as_ref(),
        extract_text_messages(&payload),
    )
    .await;

    info!(
        messages = outcome.messages,
        fallbacks = outcome.fallbacks,
        send_failures = outcome.send_failures,
        "webhook_processed"
    );

    (
        StatusCode::OK,
        Json(WebhookResponse {
            status: "processed",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::{GenerateError, SendError, FALLBACK_REPLY};
    use crate::web::app;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use hmac::{Hmac, Mac};
    use http_body_util::BodyExt;
    use sha2::Sha256;
    use std::sync::Mutex;
    use tower::ServiceExt;

    const APP_SECRET: &str = "test-app-secret";
    const VERIFY_TOKEN: &str = "test-verify-token";

    struct TestGenerator {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl TestGenerator {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl ReplyGenerator for TestGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(GenerateError::Status {
                    status: 503,
                    body: "overloaded".to_string(),
                });
            }
            Ok(format!("re: {}", prompt))
        }
    }

    struct TestSender {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl TestSender {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReplySender for TestSender {
        async fn send_text_reply(
            &self,
            to: &str,
            body: &str,
            quoted_message_id: &str,
        ) -> Result<(), SendError> {
            self.sent.lock().unwrap().push((
                to.to_string(),
                body.to_string(),
                quoted_message_id.to_string(),
            ));
            Ok(())
        }
    }

    fn test_config() -> Config {
        Config {
            verify_token: VERIFY_TOKEN.to_string(),
            app_secret: APP_SECRET.to_string(),
            whatsapp_token: "wa-token".to_string(),
            phone_number_id: "106540352242922".to_string(),
            gemini_api_key: "gm-key".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_api_base: "https://generativelanguage.googleapis.com".to_string(),
            graph_api_base: "https://graph.facebook.com/v19.0".to_string(),
            request_timeout_ms: 8000,
            port: 0,
        }
    }

    fn sign(body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(APP_SECRET.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn one_text_message_body() -> String {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "102938475610111",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [{
                            "from": "521234",
                            "id": "wamid.A",
                            "type": "text",
                            "text": {"body": "hola"}
                        }]
                    }
                }]
            }]
        })
        .to_string()
    }

    async fn post_webhook(
        generator: Arc<TestGenerator>,
        sender: Arc<TestSender>,
        body: String,
        signature: Option<String>,
    ) -> (StatusCode, String) {
        let state = AppState::new(test_config(), generator, sender);
        let router = app(state);

        let mut request = Request::builder().method("POST").uri("/webhook");
        if let Some(sig) = signature {
            request = request.header("X-Hub-Signature-256", sig);
        }

        let response = router
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    #[tokio::test]
    async fn test_verification_handshake_echoes_challenge() {
        let state = AppState::new(test_config(), TestGenerator::new(false), TestSender::new());
        let router = app(state);

        let uri = format!(
            "/webhook?hub.mode=subscribe&hub.verify_token={}&hub.challenge=xyz",
            VERIFY_TOKEN
        );
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"xyz");
    }

    #[tokio::test]
    async fn test_verification_handshake_rejects_bad_token() {
        let state = AppState::new(test_config(), TestGenerator::new(false), TestSender::new());
        let router = app(state);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=xyz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_verification_handshake_rejects_bad_mode() {
        let state = AppState::new(test_config(), TestGenerator::new(false), TestSender::new());
        let router = app(state);

        let uri = format!(
            "/webhook?hub.mode=unsubscribe&hub.verify_token={}&hub.challenge=xyz",
            VERIFY_TOKEN
        );
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_webhook_replies_to_text_message() {
        let generator = TestGenerator::new(false);
        let sender = TestSender::new();
        let body = one_text_message_body();
        let signature = sign(&body);

        let (status, _) =
            post_webhook(generator.clone(), sender.clone(), body, Some(signature)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(*generator.prompts.lock().unwrap(), vec!["hola".to_string()]);

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            (
                "521234".to_string(),
                "re: hola".to_string(),
                "wamid.A".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_webhook_missing_signature_rejected() {
        let generator = TestGenerator::new(false);
        let sender = TestSender::new();

        let (status, _) =
            post_webhook(generator.clone(), sender.clone(), one_text_message_body(), None).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        // An unverified request never reaches the collaborators
        assert!(generator.prompts.lock().unwrap().is_empty());
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_tampered_body_rejected() {
        let generator = TestGenerator::new(false);
        let sender = TestSender::new();
        let signature = sign(&one_text_message_body());
        let tampered = one_text_message_body().replace("hola", "hack");

        let (status, _) =
            post_webhook(generator.clone(), sender.clone(), tampered, Some(signature)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_unrecognized_object_not_found() {
        let generator = TestGenerator::new(false);
        let sender = TestSender::new();
        let body = serde_json::json!({"object": "page", "entry": []}).to_string();
        let signature = sign(&body);

        let (status, _) =
            post_webhook(generator.clone(), sender.clone(), body, Some(signature)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(generator.prompts.lock().unwrap().is_empty());
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_generation_failure_sends_fallback() {
        let generator = TestGenerator::new(true);
        let sender = TestSender::new();
        let body = one_text_message_body();
        let signature = sign(&body);

        let (status, _) =
            post_webhook(generator.clone(), sender.clone(), body, Some(signature)).await;

        // Generation failure is absorbed, not surfaced
        assert_eq!(status, StatusCode::OK);

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, FALLBACK_REPLY);
        assert_eq!(sent[0].2, "wamid.A");
    }

    #[tokio::test]
    async fn test_webhook_invalid_json_is_server_error() {
        let generator = TestGenerator::new(false);
        let sender = TestSender::new();
        let body = "not json".to_string();
        let signature = sign(&body);

        let (status, _) =
            post_webhook(generator.clone(), sender.clone(), body, Some(signature)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_zero_messages_is_ok() {
        let generator = TestGenerator::new(false);
        let sender = TestSender::new();
        let body =
            serde_json::json!({"object": "whatsapp_business_account", "entry": []}).to_string();
        let signature = sign(&body);

        let (status, _) =
            post_webhook(generator.clone(), sender.clone(), body, Some(signature)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(generator.prompts.lock().unwrap().is_empty());
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let state = AppState::new(test_config(), TestGenerator::new(false), TestSender::new());
        let router = app(state);

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
