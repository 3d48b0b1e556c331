//! Work queue seam and configuration.

use std::time::Duration;

use async_trait::async_trait;

use malfit_models::{JobId, DEFAULT_LOG_CAP};

use crate::error::QueueResult;

/// FIFO queue of pending job ids.
///
/// `dequeue` removes an id atomically: two concurrent callers never receive
/// the same id. There is no peek, priority or requeue.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Append a job id to the tail.
    async fn enqueue(&self, job_id: &JobId) -> QueueResult<()>;

    /// Wait up to `timeout` for an id. `Ok(None)` on timeout.
    async fn dequeue(&self, timeout: Duration) -> QueueResult<Option<JobId>>;

    /// Number of pending ids.
    async fn len(&self) -> QueueResult<u64>;
}

/// Queue and store configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// List key holding pending job ids
    pub queue_key: String,
    /// Prefix for per-job hash keys
    pub job_key_prefix: String,
    /// How long a single dequeue call blocks
    pub dequeue_timeout: Duration,
    /// Characters retained in a job's log field
    pub log_cap: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            queue_key: "queue:shorts".to_string(),
            job_key_prefix: "job:".to_string(),
            dequeue_timeout: Duration::from_secs(5),
            log_cap: DEFAULT_LOG_CAP,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            queue_key: std::env::var("QUEUE_KEY").unwrap_or_else(|_| "queue:shorts".to_string()),
            job_key_prefix: std::env::var("JOB_KEY_PREFIX").unwrap_or_else(|_| "job:".to_string()),
            dequeue_timeout: Duration::from_secs(
                std::env::var("QUEUE_DEQUEUE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            log_cap: std::env::var("WORKER_LOG_CAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LOG_CAP),
        }
    }

    /// Hash key for a job record.
    pub fn job_key(&self, job_id: &JobId) -> String {
        format!("{}{}", self.job_key_prefix, job_id)
    }
}
