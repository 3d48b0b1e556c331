//! Job store seam.

use async_trait::async_trait;

use malfit_models::{JobId, JobRecord, JobUpdate};

use crate::error::QueueResult;

/// Durable record per job id.
///
/// A job is written by a single worker at a time (the one that dequeued it),
/// so the operations here are per-call atomic and need no further locking.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist the initial record. Must complete before the id is enqueued.
    async fn create(&self, record: &JobRecord) -> QueueResult<()>;

    /// Merge the `Some` fields of `update`, leaving all others untouched.
    async fn set_fields(&self, job_id: &JobId, update: &JobUpdate) -> QueueResult<()>;

    /// Append a trace line, keeping only the newest characters.
    async fn append_log(&self, job_id: &JobId, line: &str) -> QueueResult<()>;

    /// Full current record, or `None` when the job is unknown.
    async fn read(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>>;
}
