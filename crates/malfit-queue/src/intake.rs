//! Job intake: record first, then enqueue.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use malfit_models::{JobId, JobRecord, JobUpdate};

use crate::error::QueueResult;
use crate::queue::WorkQueue;
use crate::store::JobStore;

/// Creates job records and hands their ids to the work queue.
///
/// The record is always fully written before the id is enqueued, so a worker
/// can never dequeue an id whose record is missing.
#[derive(Clone)]
pub struct Intake {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
}

impl Intake {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// Submit an already-persisted source video under a fresh job id.
    pub async fn submit(&self, source_path: impl AsRef<Path>, language: &str) -> QueueResult<JobId> {
        self.submit_with_id(JobId::new(), source_path, language).await
    }

    /// Submit under a caller-chosen id (e.g. one already used to name the
    /// uploaded file).
    pub async fn submit_with_id(
        &self,
        job_id: JobId,
        source_path: impl AsRef<Path>,
        language: &str,
    ) -> QueueResult<JobId> {
        let record = JobRecord::new(job_id.clone(), source_path, language);
        self.store.create(&record).await?;

        if let Err(e) = self.queue.enqueue(&job_id).await {
            error!(job_id = %job_id, error = %e, "Enqueue failed after record creation");
            // Leave an observable terminal state instead of a job stuck in `queued`.
            self.store
                .set_fields(&job_id, &JobUpdate::failed(format!("enqueue failed: {}", e)))
                .await
                .ok();
            return Err(e);
        }

        metrics::counter!("malfit_jobs_enqueued_total").increment(1);
        info!(
            job_id = %job_id,
            source = %record.source_path.display(),
            language = %record.language,
            "Job submitted"
        );
        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use malfit_models::JobStatus;

    use super::*;
    use crate::error::QueueError;
    use crate::memory::{MemoryJobStore, MemoryQueue};

    /// Store whose create is slow, to widen any ordering window.
    struct SlowStore {
        inner: MemoryJobStore,
    }

    #[async_trait]
    impl JobStore for SlowStore {
        async fn create(&self, record: &JobRecord) -> QueueResult<()> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.create(record).await
        }
        async fn set_fields(&self, job_id: &JobId, update: &JobUpdate) -> QueueResult<()> {
            self.inner.set_fields(job_id, update).await
        }
        async fn append_log(&self, job_id: &JobId, line: &str) -> QueueResult<()> {
            self.inner.append_log(job_id, line).await
        }
        async fn read(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
            self.inner.read(job_id).await
        }
    }

    /// Queue that refuses every id.
    struct BrokenQueue;

    #[async_trait]
    impl WorkQueue for BrokenQueue {
        async fn enqueue(&self, _job_id: &JobId) -> QueueResult<()> {
            Err(QueueError::enqueue_failed("connection reset"))
        }
        async fn dequeue(&self, _timeout: Duration) -> QueueResult<Option<JobId>> {
            Ok(None)
        }
        async fn len(&self) -> QueueResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_submit_creates_queued_record_and_enqueues() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(MemoryQueue::new());
        let intake = Intake::new(store.clone(), queue.clone());

        let job_id = intake.submit("/tmp/up/video.mp4", "en").await.unwrap();

        let record = store.read(&job_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(record.progress, 0);
        assert_eq!(record.language, "en");
        assert_eq!(
            queue.dequeue(Duration::from_millis(10)).await.unwrap(),
            Some(job_id)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_record_is_readable_whenever_id_is_dequeued() {
        let store = Arc::new(SlowStore {
            inner: MemoryJobStore::new(),
        });
        let queue = Arc::new(MemoryQueue::new());
        let intake = Intake::new(store.clone(), queue.clone());

        let consumer = {
            let store = store.clone();
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut seen = 0;
                while seen < 5 {
                    if let Some(id) = queue.dequeue(Duration::from_secs(2)).await.unwrap() {
                        assert!(store.read(&id).await.unwrap().is_some(), "record missing for {id}");
                        seen += 1;
                    }
                }
            })
        };

        for i in 0..5 {
            intake
                .submit(format!("/tmp/up/{i}.mp4"), "ko")
                .await
                .unwrap();
        }
        consumer.await.unwrap();
    }

    #[tokio::test]
    async fn test_enqueue_failure_marks_record_failed() {
        let store = Arc::new(MemoryJobStore::new());
        let intake = Intake::new(store.clone(), Arc::new(BrokenQueue));
        let job_id = JobId::from_string("stuck");

        let err = intake
            .submit_with_id(job_id.clone(), "/tmp/up/stuck.mp4", "ko")
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::EnqueueFailed(_)));

        let record = store.read(&job_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Error);
        assert!(record.error.unwrap().contains("connection reset"));
    }
}
