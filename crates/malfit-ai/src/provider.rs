//! Capability traits for the remote AI service.

use std::path::Path;

use async_trait::async_trait;

use crate::error::AiResult;

/// Audio to SRT.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe `audio` into SRT text. An empty `language` means the
    /// service default.
    async fn transcribe(&self, audio: &Path, language: &str) -> AiResult<String>;
}

/// Single-turn chat completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system: &str, user: &str, temperature: f32) -> AiResult<String>;
}
