//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup and kept immutable for the
//! process lifetime. Handlers and collaborators receive it by reference;
//! nothing reads the environment after `from_env` returns.

use std::env;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token Meta echoes back during the GET /webhook verification handshake
    pub verify_token: String,

    /// App secret used to check the X-Hub-Signature-256 header
    pub app_secret: String,

    /// WhatsApp Cloud API access token for sending replies
    pub whatsapp_token: String,

    /// Phone number id the replies are sent from
    pub phone_number_id: String,

    /// Gemini API key for reply generation
    pub gemini_api_key: String,

    /// Gemini model name
    pub gemini_model: String,

    /// Base URL of the Gemini API
    pub gemini_api_base: String,

    /// Base URL of the Graph API (includes the version segment)
    pub graph_api_base: String,

    /// HTTP request timeout in milliseconds for both outbound APIs
    pub request_timeout_ms: u64,

    /// Port for the web server to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// The five credentials are required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            verify_token: require("VERIFY_TOKEN")?,

            app_secret: require("APP_SECRET")?,

            whatsapp_token: require("WHATSAPP_TOKEN")?,

            phone_number_id: require("PHONE_NUMBER_ID")?,

            gemini_api_key: require("GEMINI_API_KEY")?,

            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),

            gemini_api_base: env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),

            graph_api_base: env::var("GRAPH_API_BASE")
                .unwrap_or_else(|_| "https://graph.facebook.com/v19.0".to_string()),

            request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        })
    }
}

/// Read a required environment variable, rejecting empty values.
fn require(name: &str) -> Result<String> {
    let value = env::var(name).with_context(|| format!("{} must be set", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} must not be empty", name);
    }
    Ok(value)
}
