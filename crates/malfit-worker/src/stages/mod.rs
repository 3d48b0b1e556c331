//! Stage adapters.
//!
//! Each stage wraps one injected capability and maps its failures onto the
//! job lifecycle: extraction and transcription failures are terminal, rewrite
//! and voice-over failures degrade.

mod audio;
mod rewrite;
mod transcribe;
mod voiceover;

use std::sync::Arc;

use malfit_ai::{SpeechToText, TextGenerator};
use malfit_media::AudioExtractor;

pub use audio::AudioStage;
pub use rewrite::{strip_code_fence, RewriteOutcome, RewriteResolution, RewriteStage};
pub use transcribe::{Transcript, TranscribeStage};
pub use voiceover::{VoiceoverOutcome, VoiceoverStage};

/// The four stages a job passes through, in order.
#[derive(Clone)]
pub struct Stages {
    pub audio: AudioStage,
    pub transcribe: TranscribeStage,
    pub rewrite: RewriteStage,
    pub voiceover: VoiceoverStage,
}

impl Stages {
    pub fn new(
        extractor: Arc<dyn AudioExtractor>,
        speech: Arc<dyn SpeechToText>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            audio: AudioStage::new(extractor),
            transcribe: TranscribeStage::new(speech),
            rewrite: RewriteStage::new(generator.clone()),
            voiceover: VoiceoverStage::new(generator),
        }
    }
}
