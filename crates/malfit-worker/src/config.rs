//! Worker configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::WorkerResult;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent worker loops
    pub concurrency: usize,
    /// Root of the shared working tree (`uploads/` and `out/` live here)
    pub root_workdir: PathBuf,
    /// How long a single dequeue call blocks
    pub dequeue_timeout: Duration,
    /// Per-invocation FFmpeg timeout in seconds (0 = no limit)
    pub ffmpeg_timeout_secs: u64,
    /// Pause after a queue error before dequeuing again
    pub error_backoff: Duration,
    /// Serve Prometheus metrics on this port when set
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            root_workdir: PathBuf::from("/tmp/malfit"),
            dequeue_timeout: Duration::from_secs(5),
            ffmpeg_timeout_secs: 0,
            error_backoff: Duration::from_secs(5),
            metrics_port: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            concurrency: std::env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(1),
            root_workdir: std::env::var("ROOT_WORKDIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/malfit")),
            dequeue_timeout: Duration::from_secs(
                std::env::var("QUEUE_DEQUEUE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            ffmpeg_timeout_secs: std::env::var("WORKER_FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            error_backoff: Duration::from_secs(
                std::env::var("WORKER_ERROR_BACKOFF_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            metrics_port: std::env::var("WORKER_METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root_workdir = root.as_ref().to_path_buf();
        self
    }

    /// Where uploaded sources are stored.
    pub fn uploads_dir(&self) -> PathBuf {
        self.root_workdir.join("uploads")
    }

    /// Where artifacts are written.
    pub fn out_dir(&self) -> PathBuf {
        self.root_workdir.join("out")
    }

    /// Create `uploads/` and `out/` if missing.
    pub async fn ensure_dirs(&self) -> WorkerResult<()> {
        tokio::fs::create_dir_all(self.uploads_dir()).await?;
        tokio::fs::create_dir_all(self.out_dir()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dirs_under_root() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = WorkerConfig::default().with_root(tmp.path());
        assert_eq!(config.uploads_dir(), tmp.path().join("uploads"));
        assert_eq!(config.out_dir(), tmp.path().join("out"));

        config.ensure_dirs().await.unwrap();
        assert!(config.uploads_dir().is_dir());
        assert!(config.out_dir().is_dir());
    }
}
