//! Job worker.
//!
//! Pulls job ids off the work queue and drives each through audio
//! extraction, transcription, rewrite and voice-over, recording progress on
//! the job store as it goes.

pub mod artifacts;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod stages;

pub use artifacts::{ArtifactSet, ArtifactWriter};
pub use cleanup::{cleanup_job_files, CleanupReport};
pub use config::WorkerConfig;
pub use error::{StageError, StageErrorKind, WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use pipeline::{JobOutcome, JobPipeline, DEQUEUED_PROGRESS};
pub use stages::Stages;
