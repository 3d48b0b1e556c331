//! Remote AI capabilities: speech-to-text and chat completion.

pub mod config;
pub mod error;
pub mod openai;
pub mod provider;

pub use config::AiConfig;
pub use error::{AiError, AiResult};
pub use openai::OpenAiClient;
pub use provider::{SpeechToText, TextGenerator};
