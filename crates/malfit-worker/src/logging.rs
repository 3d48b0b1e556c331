//! Structured job logging utilities.
//!
//! Every lifecycle line goes to `tracing` with the job id attached. Lines that
//! users should see are also appended to the job record's `log` field.

use std::sync::Arc;

use tracing::{error, info, warn, Span};

use malfit_models::JobId;
use malfit_queue::JobStore;

/// Job logger for structured logging with consistent formatting.
#[derive(Clone)]
pub struct JobLogger {
    job_id: JobId,
    store: Arc<dyn JobStore>,
}

impl JobLogger {
    pub fn new(job_id: &JobId, store: Arc<dyn JobStore>) -> Self {
        Self {
            job_id: job_id.clone(),
            store,
        }
    }

    /// Log the start of a job.
    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, "Job started: {}", message);
    }

    /// Log progress and record it on the job.
    pub async fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, "Job progress: {}", message);
        self.trace(message).await;
    }

    /// Log a non-fatal problem and record it on the job.
    pub async fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, "Job warning: {}", message);
        self.trace(message).await;
    }

    /// Log the terminal failure and record it on the job.
    pub async fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, "Job error: {}", message);
        self.trace(&format!("error: {}", message)).await;
    }

    /// Log the completion of a job.
    pub async fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, "Job completed: {}", message);
        self.trace(message).await;
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id)
    }

    /// Append to the job's log field. A failed append never fails the job.
    async fn trace(&self, line: &str) {
        if let Err(e) = self.store.append_log(&self.job_id, line).await {
            warn!(job_id = %self.job_id, error = %e, "Failed to append job log");
        }
    }
}

#[cfg(test)]
mod tests {
    use malfit_models::JobRecord;
    use malfit_queue::MemoryJobStore;

    use super::*;

    #[tokio::test]
    async fn test_lines_reach_job_log() {
        let store = Arc::new(MemoryJobStore::new());
        let job_id = JobId::from_string("j1");
        store
            .create(&JobRecord::new(job_id.clone(), "/tmp/j1.mp4", "ko"))
            .await
            .unwrap();

        let logger = JobLogger::new(&job_id, store.clone());
        logger.log_start("not recorded");
        logger.log_progress("audio: copy").await;
        logger.log_error("boom").await;

        let record = store.read(&job_id).await.unwrap().unwrap();
        assert_eq!(record.log, "audio: copy\nerror: boom");
    }

    #[tokio::test]
    async fn test_unknown_job_does_not_panic() {
        let logger = JobLogger::new(&JobId::from_string("ghost"), Arc::new(MemoryJobStore::new()));
        logger.log_warning("nobody listens").await;
        assert_eq!(logger.job_id().as_str(), "ghost");
    }
}
