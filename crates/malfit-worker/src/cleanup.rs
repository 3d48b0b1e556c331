//! Post-job file cleanup.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::metrics;

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Delete the source and every derived audio candidate.
///
/// Missing files are not an error. Other failures are logged and counted but
/// never returned.
pub async fn cleanup_job_files(source: &Path, candidates: &[PathBuf]) -> CleanupReport {
    let mut report = CleanupReport::default();

    for path in candidates.iter().map(PathBuf::as_path).chain(std::iter::once(source)) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed job file");
                report.removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove job file");
                metrics::record_cleanup_failure();
                report.failed.push(path.to_path_buf());
            }
        }
    }

    report
}
