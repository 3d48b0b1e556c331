//! Job status handler.

use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use malfit_models::{JobId, JobRecord, JobResult, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Job record as served by `GET /jobs/:job_id`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub source_path: PathBuf,
    pub language: String,
    pub duration_sec: f64,
    pub log: String,
    pub error: Option<String>,
    pub result: Option<JobResult>,
    pub created_at: DateTime<Utc>,
}

impl From<JobRecord> for JobStatusResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.job_id,
            status: record.status,
            progress: record.progress,
            source_path: record.source_path,
            language: record.language,
            duration_sec: record.duration_sec,
            log: record.log,
            error: record.error,
            result: record.result,
            created_at: record.created_at,
        }
    }
}

/// `GET /jobs/:job_id`
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let record = state
        .store
        .read(&JobId::from_string(job_id))
        .await?
        .ok_or_else(|| ApiError::not_found("not found"))?;

    Ok(Json(record.into()))
}
