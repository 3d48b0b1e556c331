//! Job records tracked from intake to a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{JobResult, JobStatus};

/// Language hint used when intake does not supply one.
pub const DEFAULT_LANGUAGE: &str = "ko";

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full job record as held by the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Unique job identifier
    pub job_id: JobId,
    /// Current pipeline status
    pub status: JobStatus,
    /// Coarse progress percentage (0-100)
    pub progress: u8,
    /// Uploaded video, owned by the job until cleanup
    pub source_path: PathBuf,
    /// Transcription language hint
    pub language: String,
    /// Source duration, 0.0 until probed
    pub duration_sec: f64,
    /// Bounded human-readable trace
    #[serde(default)]
    pub log: String,
    /// Failure description, only when `status = error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Artifact references, only when `status = done`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create the initial `queued` record for a freshly submitted job.
    pub fn new(job_id: JobId, source_path: impl AsRef<Path>, language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            job_id,
            status: JobStatus::Queued,
            progress: 0,
            source_path: source_path.as_ref().to_path_buf(),
            language: if language.trim().is_empty() {
                DEFAULT_LANGUAGE.to_string()
            } else {
                language
            },
            duration_sec: 0.0,
            log: String::new(),
            error: None,
            result: None,
            created_at: Utc::now(),
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Merge `update` into this record, last write wins per field.
    pub fn apply(&mut self, update: &JobUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = progress.min(100);
        }
        if let Some(duration) = update.duration_sec {
            self.duration_sec = duration;
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        if let Some(result) = &update.result {
            self.result = Some(result.clone());
        }
    }
}

/// Partial update to a job record. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

impl JobUpdate {
    /// Enter `status`, writing its progress checkpoint alongside.
    pub fn enter(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            progress: status.checkpoint(),
            ..Default::default()
        }
    }

    /// Progress-only update.
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    /// Record the probed source duration.
    pub fn duration(duration_sec: f64) -> Self {
        Self {
            duration_sec: Some(duration_sec),
            ..Default::default()
        }
    }

    /// Terminal failure. Progress is left where it was.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Terminal success.
    pub fn done(result: JobResult) -> Self {
        Self {
            result: Some(result),
            ..Self::enter(JobStatus::Done)
        }
    }

    /// Whether the update writes nothing.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.duration_sec.is_none()
            && self.error.is_none()
            && self.result.is_none()
    }
}
