//! Per-job pipeline.
//!
//! Drives one job from `queued` to a terminal state:
//! audio_extract → transcribing → rewriting → voiceover → done.
//! Any terminal stage failure ends the job in `error`. Source and derived
//! audio are removed before the terminal state is written, so a job observed
//! as `done`/`error` never still owns files on disk.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinError;
use tracing::{error, warn, Instrument};

use malfit_media::MediaProber;
use malfit_models::{JobId, JobRecord, JobResult, JobStatus, JobUpdate};
use malfit_queue::JobStore;

use crate::artifacts::{ArtifactSet, ArtifactWriter};
use crate::cleanup::cleanup_job_files;
use crate::error::{StageError, StageErrorKind};
use crate::logging::JobLogger;
use crate::metrics;
use crate::stages::{RewriteResolution, Stages};

/// Progress written right after a job is picked up.
pub const DEQUEUED_PROGRESS: u8 = 5;

/// How a processed job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Done(JobResult),
    Failed(StageError),
    /// No record exists for the dequeued id.
    Missing,
    /// The record had already reached `done` or `error`.
    AlreadyTerminal,
}

/// Runs the stages for one job at a time. Shared by all worker loops.
pub struct JobPipeline {
    store: Arc<dyn JobStore>,
    prober: Arc<dyn MediaProber>,
    stages: Stages,
    artifacts: ArtifactWriter,
}

/// Status cursor that only moves along legal transitions.
struct Lifecycle<'a> {
    store: &'a dyn JobStore,
    job_id: &'a JobId,
    status: JobStatus,
}

impl Lifecycle<'_> {
    async fn enter(&mut self, next: JobStatus) -> Result<(), StageError> {
        let next = self.status.transition(next)?;
        self.store
            .set_fields(self.job_id, &JobUpdate::enter(next))
            .await?;
        self.status = next;
        Ok(())
    }
}

impl JobPipeline {
    pub fn new(
        store: Arc<dyn JobStore>,
        prober: Arc<dyn MediaProber>,
        stages: Stages,
        artifacts: ArtifactWriter,
    ) -> Self {
        Self {
            store,
            prober,
            stages,
            artifacts,
        }
    }

    /// Process a dequeued job to completion. Never returns an error: every
    /// failure is recorded on the job itself.
    pub async fn process(&self, job_id: &JobId) -> JobOutcome {
        let record = match self.store.read(job_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(job_id = %job_id, "Dequeued job has no record, skipping");
                return JobOutcome::Missing;
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to load job record");
                return JobOutcome::Failed(e.into());
            }
        };

        if record.is_terminal() {
            warn!(job_id = %job_id, status = %record.status, "Dequeued job already finished, skipping");
            return JobOutcome::AlreadyTerminal;
        }

        let logger = JobLogger::new(job_id, Arc::clone(&self.store));
        let span = logger.create_span();
        self.process_record(record, logger).instrument(span).await
    }

    /// Like [`process`](Self::process), but on a task of its own. A panic in
    /// a stage still ends the job in `error` with its files removed, and the
    /// caller keeps running.
    pub async fn process_isolated(self: &Arc<Self>, job_id: &JobId) -> JobOutcome {
        let task = {
            let pipeline = Arc::clone(self);
            let job_id = job_id.clone();
            tokio::spawn(async move { pipeline.process(&job_id).await })
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => self.abandon(job_id, panic_message(e)).await,
        }
    }

    async fn process_record(&self, record: JobRecord, logger: JobLogger) -> JobOutcome {
        let source = record.source_path.as_path();
        logger.log_start(&format!("source={} language={}", source.display(), record.language));

        let outcome = self.run_stages(&record, &logger).await;
        self.finish(&record, &logger, outcome).await
    }

    /// Close out a job whose processing task died.
    async fn abandon(&self, job_id: &JobId, reason: String) -> JobOutcome {
        error!(job_id = %job_id, reason = %reason, "Job processing panicked");
        let failure = StageError::new(StageErrorKind::Internal, format!("worker crashed: {}", reason));

        let record = match self.store.read(job_id).await {
            Ok(Some(record)) if !record.is_terminal() => record,
            Ok(_) => return JobOutcome::Failed(failure),
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to load crashed job");
                return JobOutcome::Failed(failure);
            }
        };

        let logger = JobLogger::new(job_id, Arc::clone(&self.store));
        self.finish(&record, &logger, Err(failure)).await
    }

    /// Remove the job's files, then write its final log line and terminal
    /// state. Nothing touches the record after the terminal write.
    async fn finish(
        &self,
        record: &JobRecord,
        logger: &JobLogger,
        outcome: Result<JobResult, StageError>,
    ) -> JobOutcome {
        let job_id = &record.job_id;
        let source = record.source_path.as_path();

        let report = cleanup_job_files(source, &self.stages.audio.candidates(source)).await;
        if !report.failed.is_empty() {
            warn!(job_id = %job_id, failed = report.failed.len(), "Cleanup left files behind");
        }

        match outcome {
            Ok(result) => {
                logger.log_completion("done").await;
                if let Err(e) = self.store.set_fields(job_id, &JobUpdate::done(result.clone())).await {
                    error!(job_id = %job_id, error = %e, "Failed to record completion");
                }
                metrics::record_job_completed();
                JobOutcome::Done(result)
            }
            Err(e) => {
                logger.log_error(&e.message).await;
                if let Err(store_err) = self.store.set_fields(job_id, &JobUpdate::failed(&e.message)).await {
                    error!(job_id = %job_id, error = %store_err, "Failed to record failure");
                }
                metrics::record_job_failed(e.kind);
                JobOutcome::Failed(e)
            }
        }
    }

    async fn run_stages(&self, record: &JobRecord, logger: &JobLogger) -> Result<JobResult, StageError> {
        let job_id = &record.job_id;
        let source = record.source_path.as_path();
        let mut lifecycle = Lifecycle {
            store: self.store.as_ref(),
            job_id,
            status: record.status,
        };

        self.store
            .set_fields(job_id, &JobUpdate::progress(DEQUEUED_PROGRESS))
            .await?;

        if !source.exists() {
            return Err(StageError::input(format!(
                "uploaded file not found: {}",
                source.display()
            )));
        }
        self.record_duration(job_id, source, logger).await?;

        lifecycle.enter(JobStatus::AudioExtract).await?;
        let started = Instant::now();
        let audio = self.stages.audio.run(source).await?;
        metrics::record_stage_duration("audio_extract", started.elapsed().as_secs_f64());
        metrics::record_extraction_tier(audio.tier);
        logger
            .log_progress(&format!("audio: {} ({})", audio.tier, audio.path.display()))
            .await;

        lifecycle.enter(JobStatus::Transcribing).await?;
        let started = Instant::now();
        let transcript = self.stages.transcribe.run(&audio.path, &record.language).await?;
        metrics::record_stage_duration("transcribing", started.elapsed().as_secs_f64());
        logger
            .log_progress(&format!("transcript: {} blocks", transcript.document.len()))
            .await;

        lifecycle.enter(JobStatus::Rewriting).await?;
        let started = Instant::now();
        let rewrite = self.stages.rewrite.run(&transcript).await;
        metrics::record_stage_duration("rewriting", started.elapsed().as_secs_f64());
        metrics::record_rewrite_outcome(rewrite.resolution.label());
        match &rewrite.resolution {
            RewriteResolution::FellBack(_) => logger.log_warning(&rewrite.resolution.to_string()).await,
            _ => logger.log_progress(&rewrite.resolution.to_string()).await,
        }

        lifecycle.enter(JobStatus::Voiceover).await?;
        let started = Instant::now();
        let voiceover = self.stages.voiceover.run(&rewrite.srt).await;
        metrics::record_stage_duration("voiceover", started.elapsed().as_secs_f64());
        if let Some(reason) = &voiceover.failure {
            logger
                .log_warning(&format!("voice-over failed, writing empty script: {}", reason))
                .await;
        }

        let result = self
            .artifacts
            .write_all(
                job_id,
                ArtifactSet {
                    transcript: &transcript.srt,
                    rewritten: &rewrite.srt,
                    voiceover: &voiceover.text,
                },
            )
            .await
            .map_err(|e| StageError::storage(format!("failed to write artifacts: {}", e)))?;

        Ok(result)
    }

    /// Store the source duration. Probing failures only cost the number.
    async fn record_duration(&self, job_id: &JobId, source: &Path, logger: &JobLogger) -> Result<(), StageError> {
        let duration = match self.prober.duration(source).await {
            Ok(d) => d,
            Err(e) => {
                logger.log_warning(&format!("duration probe failed: {}", e)).await;
                0.0
            }
        };
        self.store.set_fields(job_id, &JobUpdate::duration(duration)).await?;
        Ok(())
    }
}

fn panic_message(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
