//! Remote AI service configuration.

use std::time::Duration;

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Bearer token
    pub api_key: String,
    /// API root, without trailing slash
    pub base_url: String,
    /// Speech-to-text model
    pub transcribe_model: String,
    /// Chat completion model
    pub chat_model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            transcribe_model: "whisper-1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl AiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENAI_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            transcribe_model: std::env::var("OPENAI_TRANSCRIBE_MODEL")
                .unwrap_or(defaults.transcribe_model),
            chat_model: std::env::var("OPENAI_CHAT_MODEL").unwrap_or(defaults.chat_model),
            timeout: Duration::from_secs(
                std::env::var("OPENAI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }

    /// Point the client at another root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }
}
