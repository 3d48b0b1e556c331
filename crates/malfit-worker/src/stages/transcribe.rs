use std::path::Path;
use std::sync::Arc;

use malfit_ai::SpeechToText;
use malfit_models::{SubtitleDocument, DEFAULT_LANGUAGE};

use crate::error::StageError;

/// Transcription as returned by the service, plus its parsed form.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub srt: String,
    pub document: SubtitleDocument,
}

#[derive(Clone)]
pub struct TranscribeStage {
    speech: Arc<dyn SpeechToText>,
}

impl TranscribeStage {
    pub fn new(speech: Arc<dyn SpeechToText>) -> Self {
        Self { speech }
    }

    /// Transcribe `audio`. Remote failures and unparseable SRT are terminal.
    pub async fn run(&self, audio: &Path, language: &str) -> Result<Transcript, StageError> {
        let language = match language.trim() {
            "" => DEFAULT_LANGUAGE,
            lang => lang,
        };

        let srt = self
            .speech
            .transcribe(audio, language)
            .await
            .map_err(|e| StageError::transcription(e.to_string()))?;

        let document = SubtitleDocument::parse(&srt).map_err(|e| {
            StageError::transcription(format!("malformed transcript: {}", e))
        })?;

        Ok(Transcript { srt, document })
    }
}
