//! Artifact download handler.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use malfit_models::{ArtifactKind, JobId, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const NOT_READY: &str = "file not ready";

/// `GET /download/:job_id/:kind` where kind is `srt`, `rewritten` or `vo`.
///
/// Artifacts are only served once the job is `done`.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path((job_id, kind)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let kind: ArtifactKind = kind.parse().map_err(|_| ApiError::not_found(NOT_READY))?;
    let job_id = JobId::from_string(job_id);

    let done = state
        .store
        .read(&job_id)
        .await?
        .is_some_and(|record| record.status == JobStatus::Done);
    if !done {
        return Err(ApiError::not_found(NOT_READY));
    }

    let path = kind.path(state.config.out_dir(), &job_id);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(NOT_READY))
        }
        Err(e) => return Err(e.into()),
    };

    let headers = [
        (
            header::CONTENT_TYPE,
            format!("{}; charset=utf-8", kind.media_type()),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", kind.file_name(&job_id)),
        ),
    ];
    Ok((headers, bytes))
}
