//! In-process queue and store.
//!
//! Same contracts as the Redis backends. Test fixtures only: the store keeps
//! every snapshot of every job so tests can inspect a job's history.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::Instant;

use malfit_models::{append_capped, JobId, JobRecord, JobUpdate, DEFAULT_LOG_CAP};

use crate::error::{QueueError, QueueResult};
use crate::queue::WorkQueue;
use crate::store::JobStore;

/// FIFO queue guarded by a mutex; waiters are woken through `Notify`.
#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<JobId>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn enqueue(&self, job_id: &JobId) -> QueueResult<()> {
        self.items.lock().await.push_back(job_id.clone());
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> QueueResult<Option<JobId>> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a concurrent enqueue
            // between the check and the wait is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(job_id) = self.items.lock().await.pop_front() {
                return Ok(Some(job_id));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn len(&self) -> QueueResult<u64> {
        Ok(self.items.lock().await.len() as u64)
    }
}

/// Job records in a map, with every written snapshot kept per job.
pub struct MemoryJobStore {
    records: RwLock<HashMap<JobId, JobRecord>>,
    history: RwLock<HashMap<JobId, Vec<JobRecord>>>,
    log_cap: usize,
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::with_log_cap(DEFAULT_LOG_CAP)
    }
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_cap(log_cap: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
            log_cap,
        }
    }

    /// Every state the record has been in, oldest first.
    pub async fn history(&self, job_id: &JobId) -> Vec<JobRecord> {
        self.history
            .read()
            .await
            .get(job_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn mutate<F>(&self, job_id: &JobId, f: F) -> QueueResult<()>
    where
        F: FnOnce(&mut JobRecord) + Send,
    {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(job_id)
            .ok_or_else(|| QueueError::JobNotFound(job_id.clone()))?;
        f(record);
        let snapshot = record.clone();
        drop(records);

        self.history
            .write()
            .await
            .entry(job_id.clone())
            .or_default()
            .push(snapshot);
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, record: &JobRecord) -> QueueResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.job_id) {
            return Err(QueueError::AlreadyExists(record.job_id.clone()));
        }
        records.insert(record.job_id.clone(), record.clone());
        drop(records);

        self.history
            .write()
            .await
            .insert(record.job_id.clone(), vec![record.clone()]);
        Ok(())
    }

    async fn set_fields(&self, job_id: &JobId, update: &JobUpdate) -> QueueResult<()> {
        self.mutate(job_id, |record| record.apply(update)).await
    }

    async fn append_log(&self, job_id: &JobId, line: &str) -> QueueResult<()> {
        let cap = self.log_cap;
        self.mutate(job_id, |record| {
            record.log = append_capped(&record.log, line, cap);
        })
        .await
    }

    async fn read(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        Ok(self.records.read().await.get(job_id).cloned())
    }
}
