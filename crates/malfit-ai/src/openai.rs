//! OpenAI-compatible HTTP client.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::provider::{SpeechToText, TextGenerator};

/// Client for `/audio/transcriptions` and `/chat/completions`.
#[derive(Clone)]
pub struct OpenAiClient {
    config: AiConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a client. Fails when no API key is configured.
    pub fn new(config: AiConfig) -> AiResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey);
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> AiResult<Self> {
        Self::new(AiConfig::from_env())
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn check(response: Response) -> AiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AiError::api(status.as_u16(), body))
    }
}

#[async_trait]
impl SpeechToText for OpenAiClient {
    async fn transcribe(&self, audio: &Path, language: &str) -> AiResult<String> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        debug!(file = %file_name, bytes = bytes.len(), "Uploading audio for transcription");

        let mut form = Form::new()
            .text("model", self.config.transcribe_model.clone())
            .text("response_format", "srt")
            .part(
                "file",
                Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("application/octet-stream")?,
            );
        if !language.is_empty() {
            form = form.text("language", language.to_string());
        }

        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;
        let text = Self::check(response).await?.text().await?;

        info!(chars = text.len(), "Transcription received");
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(&self, system: &str, user: &str, temperature: f32) -> AiResult<String> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let parsed: ChatResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::invalid_response(format!("Failed to parse chat response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::invalid_response("No choices in chat response"))?;
        Ok(choice.message.content.unwrap_or_default())
    }
}
