//! Shared data models for the malfit job engine.
//!
//! This crate provides Serde-serializable types for:
//! - Job records and partial updates
//! - The job status state machine and progress checkpoints
//! - Artifact naming conventions
//! - SubRip (SRT) subtitle documents

pub mod artifact;
pub mod job;
pub mod job_status;
pub mod log;
pub mod subtitle;
pub mod timestamp;

// Re-export common types
pub use artifact::{ArtifactKind, JobResult};
pub use job::{JobId, JobRecord, JobUpdate, DEFAULT_LANGUAGE};
pub use job_status::{InvalidTransition, JobStatus};
pub use log::{append_capped, DEFAULT_LOG_CAP};
pub use subtitle::{Conformance, SubtitleBlock, SubtitleDocument, SubtitleError};
pub use timestamp::{SrtTimestamp, TimestampError};
