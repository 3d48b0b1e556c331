//! Job status state machine.
//!
//! A job moves strictly forward through the pipeline stages:
//!
//! ```text
//! queued -> audio_extract -> transcribing -> rewriting -> voiceover -> done
//!    \            \               \             \            \
//!     `------------`---------------`-------------`------------`--> error
//! ```
//!
//! Each non-terminal status has a fixed progress checkpoint that is written
//! together with the status when the worker enters the stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is queued waiting for a worker
    #[default]
    Queued,
    /// Deriving an audio stream from the source video
    AudioExtract,
    /// Speech-to-text in progress
    Transcribing,
    /// Paraphrasing the transcript
    Rewriting,
    /// Writing the narration script
    Voiceover,
    /// All artifacts written
    Done,
    /// Job failed with an error
    Error,
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

impl JobStatus {
    /// Every status in pipeline order, terminal states last.
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Queued,
        JobStatus::AudioExtract,
        JobStatus::Transcribing,
        JobStatus::Rewriting,
        JobStatus::Voiceover,
        JobStatus::Done,
        JobStatus::Error,
    ];

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::AudioExtract => "audio_extract",
            JobStatus::Transcribing => "transcribing",
            JobStatus::Rewriting => "rewriting",
            JobStatus::Voiceover => "voiceover",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Progress percentage written when the job enters this status.
    ///
    /// `Error` has no checkpoint: a failed job keeps the progress it reached.
    pub fn checkpoint(&self) -> Option<u8> {
        match self {
            JobStatus::Queued => Some(0),
            JobStatus::AudioExtract => Some(15),
            JobStatus::Transcribing => Some(40),
            JobStatus::Rewriting => Some(70),
            JobStatus::Voiceover => Some(85),
            JobStatus::Done => Some(100),
            JobStatus::Error => None,
        }
    }

    /// The next status on the happy path, if any.
    pub fn next(&self) -> Option<JobStatus> {
        match self {
            JobStatus::Queued => Some(JobStatus::AudioExtract),
            JobStatus::AudioExtract => Some(JobStatus::Transcribing),
            JobStatus::Transcribing => Some(JobStatus::Rewriting),
            JobStatus::Rewriting => Some(JobStatus::Voiceover),
            JobStatus::Voiceover => Some(JobStatus::Done),
            JobStatus::Done | JobStatus::Error => None,
        }
    }

    /// Whether `to` may directly follow `self`.
    ///
    /// Only the single next stage or `Error` is allowed; terminal states
    /// accept nothing and no state is re-entered.
    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == JobStatus::Error || self.next() == Some(to)
    }

    /// Validate a transition, returning the target on success.
    pub fn transition(self, to: JobStatus) -> Result<JobStatus, InvalidTransition> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status: {}", s))
    }
}
