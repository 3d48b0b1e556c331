//! Job executor.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use malfit_queue::WorkQueue;

use crate::config::WorkerConfig;
use crate::pipeline::{JobOutcome, JobPipeline};

/// Runs `concurrency` worker loops against a shared queue.
///
/// Each loop dequeues one id at a time and processes it to completion; the
/// queue's atomic pop is the only coordination between loops.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<dyn WorkQueue>,
    pipeline: Arc<JobPipeline>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, queue: Arc<dyn WorkQueue>, pipeline: Arc<JobPipeline>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            queue,
            pipeline,
            shutdown,
        }
    }

    /// Run until [`shutdown`](Self::shutdown) is called and every loop has
    /// finished the job in hand.
    pub async fn run(&self) {
        info!(
            "Starting job executor with {} worker loop(s)",
            self.config.concurrency
        );

        let mut loops = JoinSet::new();
        for worker in 0..self.config.concurrency {
            loops.spawn(worker_loop(
                worker,
                self.config.clone(),
                Arc::clone(&self.queue),
                Arc::clone(&self.pipeline),
                self.shutdown.subscribe(),
            ));
        }

        while let Some(joined) = loops.join_next().await {
            if let Err(e) = joined {
                error!("Worker loop panicked: {}", e);
            }
        }

        info!("Job executor stopped");
    }

    /// Signal shutdown. Loops stop dequeuing; jobs in hand run to the end.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

async fn worker_loop(
    worker: usize,
    config: WorkerConfig,
    queue: Arc<dyn WorkQueue>,
    pipeline: Arc<JobPipeline>,
    shutdown: watch::Receiver<bool>,
) {
    info!(worker, "Worker loop started");

    // The dequeue itself is never cancelled: an id popped by the backend
    // must reach the pipeline. Shutdown latency is bounded by the timeout.
    while !*shutdown.borrow() {
        let job_id = match queue.dequeue(config.dequeue_timeout).await {
            Ok(Some(job_id)) => job_id,
            Ok(None) => continue,
            Err(e) => {
                error!(worker, error = %e, "Error dequeuing job");
                tokio::time::sleep(config.error_backoff).await;
                continue;
            }
        };

        debug!(worker, job_id = %job_id, "Dequeued job");
        match pipeline.process_isolated(&job_id).await {
            JobOutcome::Done(_) => info!(worker, job_id = %job_id, "Job done"),
            JobOutcome::Failed(e) => {
                info!(worker, job_id = %job_id, kind = %e.kind, "Job failed")
            }
            JobOutcome::Missing | JobOutcome::AlreadyTerminal => {}
        }
    }

    info!(worker, "Worker loop stopped");
}
