//! Worker error types.

use std::fmt;

use thiserror::Error;

use malfit_media::MediaError;
use malfit_models::InvalidTransition;
use malfit_queue::QueueError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Which part of the pipeline a job failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageErrorKind {
    /// Source missing or unusable (no audio track)
    Input,
    /// Every extraction tier failed
    Extraction,
    /// Remote transcription failed or returned malformed SRT
    Transcription,
    /// Artifacts could not be written
    Storage,
    /// The job store rejected a write
    Store,
    /// Broken lifecycle invariant
    Internal,
}

impl StageErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageErrorKind::Input => "input",
            StageErrorKind::Extraction => "extraction",
            StageErrorKind::Transcription => "transcription",
            StageErrorKind::Storage => "storage",
            StageErrorKind::Store => "store",
            StageErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a job stage. `message` is what the job record shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StageError {
    pub kind: StageErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(kind: StageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(StageErrorKind::Input, message)
    }

    pub fn transcription(message: impl Into<String>) -> Self {
        Self::new(StageErrorKind::Transcription, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(StageErrorKind::Storage, message)
    }
}

impl From<MediaError> for StageError {
    fn from(e: MediaError) -> Self {
        let kind = if e.is_input_error() {
            StageErrorKind::Input
        } else {
            StageErrorKind::Extraction
        };
        Self::new(kind, e.to_string())
    }
}

impl From<QueueError> for StageError {
    fn from(e: QueueError) -> Self {
        Self::new(StageErrorKind::Store, e.to_string())
    }
}

impl From<InvalidTransition> for StageError {
    fn from(e: InvalidTransition) -> Self {
        Self::new(StageErrorKind::Internal, e.to_string())
    }
}
