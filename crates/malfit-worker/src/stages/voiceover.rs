use std::sync::Arc;

use malfit_ai::TextGenerator;

const SYSTEM_PROMPT: &str = "You are a voice-over writer working in the language of the \
transcript. Remove all timecodes and write natural, spoken-style paragraphs.";

const TEMPERATURE: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceoverOutcome {
    pub text: String,
    /// Set when the remote call failed and `text` is empty.
    pub failure: Option<String>,
}

/// Turns subtitles into timestamp-free narration. Never fails.
#[derive(Clone)]
pub struct VoiceoverStage {
    generator: Arc<dyn TextGenerator>,
}

impl VoiceoverStage {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn run(&self, srt: &str) -> VoiceoverOutcome {
        let user = format!(
            "[SRT]\n{}\n[/SRT]\nRemove the timecodes and output the narration script only.",
            srt
        );

        match self.generator.complete(SYSTEM_PROMPT, &user, TEMPERATURE).await {
            Ok(text) => VoiceoverOutcome {
                text: text.trim().to_string(),
                failure: None,
            },
            Err(e) => VoiceoverOutcome {
                text: String::new(),
                failure: Some(e.to_string()),
            },
        }
    }
}
