//! Artifact persistence.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use malfit_models::{ArtifactKind, JobId, JobResult};

/// Text content of the three artifacts.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactSet<'a> {
    pub transcript: &'a str,
    pub rewritten: &'a str,
    pub voiceover: &'a str,
}

impl<'a> ArtifactSet<'a> {
    fn content(&self, kind: ArtifactKind) -> &'a str {
        match kind {
            ArtifactKind::Transcript => self.transcript,
            ArtifactKind::Rewritten => self.rewritten,
            ArtifactKind::VoiceOver => self.voiceover,
        }
    }
}

/// Writes job artifacts under a single output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    out_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    /// Write all three artifacts. Either all of them exist afterwards or
    /// none do.
    pub async fn write_all(&self, job_id: &JobId, set: ArtifactSet<'_>) -> std::io::Result<JobResult> {
        tokio::fs::create_dir_all(&self.out_dir).await?;

        let mut written = Vec::with_capacity(ArtifactKind::ALL.len());
        for kind in ArtifactKind::ALL {
            let path = kind.path(&self.out_dir, job_id);
            if let Err(e) = tokio::fs::write(&path, set.content(kind)).await {
                self.discard(&written).await;
                return Err(e);
            }
            debug!(job_id = %job_id, kind = %kind, path = %path.display(), "Artifact written");
            written.push(path);
        }

        Ok(JobResult::for_job(job_id))
    }

    async fn discard(&self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove partial artifact");
            }
        }
    }
}
