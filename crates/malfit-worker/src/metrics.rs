//! Worker metrics.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use malfit_media::LadderTier;

use crate::error::{StageErrorKind, WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "malfit_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "malfit_jobs_failed_total";
    pub const EXTRACTION_TIER_TOTAL: &str = "malfit_extraction_tier_total";
    pub const STAGE_DURATION_SECONDS: &str = "malfit_stage_duration_seconds";
    pub const REWRITE_OUTCOME_TOTAL: &str = "malfit_rewrite_outcome_total";
    pub const CLEANUP_FAILURES_TOTAL: &str = "malfit_cleanup_failures_total";
}

/// Serve `/metrics` on `0.0.0.0:{port}` from a background listener.
pub fn install_exporter(port: u16) -> WorkerResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

pub fn record_job_failed(kind: StageErrorKind) {
    counter!(names::JOBS_FAILED_TOTAL, "kind" => kind.as_str()).increment(1);
}

pub fn record_extraction_tier(tier: LadderTier) {
    counter!(names::EXTRACTION_TIER_TOTAL, "tier" => tier.label()).increment(1);
}

pub fn record_stage_duration(stage: &'static str, secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(secs);
}

pub fn record_rewrite_outcome(outcome: &'static str) {
    counter!(names::REWRITE_OUTCOME_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_cleanup_failure() {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(1);
}
