use std::path::{Path, PathBuf};
use std::sync::Arc;

use malfit_media::{AudioExtractor, ExtractedAudio};

use crate::error::StageError;

/// Audio extraction through the configured extractor.
#[derive(Clone)]
pub struct AudioStage {
    extractor: Arc<dyn AudioExtractor>,
}

impl AudioStage {
    pub fn new(extractor: Arc<dyn AudioExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn run(&self, source: &Path) -> Result<ExtractedAudio, StageError> {
        Ok(self.extractor.extract(source).await?)
    }

    /// Derived files to remove once the job is over, whether or not
    /// extraction ran.
    pub fn candidates(&self, source: &Path) -> Vec<PathBuf> {
        self.extractor.candidates(source)
    }
}
