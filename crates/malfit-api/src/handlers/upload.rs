//! Video upload handler.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use malfit_models::{JobId, DEFAULT_LANGUAGE};

use crate::config::allowed_extension;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub job_id: JobId,
}

/// `POST /upload` (multipart: `file`, optional `language`).
///
/// The video is streamed to `uploads/{jobId}.{ext}` and the job is submitted
/// only once the whole file is on disk.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut saved: Option<(JobId, PathBuf, u64)> = None;
    let mut language = DEFAULT_LANGUAGE.to_string();

    if let Err(e) = read_fields(&state, &mut multipart, &mut saved, &mut language).await {
        if let Some((_, path, _)) = &saved {
            remove_partial(path).await;
        }
        return Err(e);
    }

    let Some((job_id, path, bytes)) = saved else {
        metrics::record_upload_rejected("missing_file");
        return Err(ApiError::bad_request("file is required"));
    };

    if let Err(e) = state.intake.submit_with_id(job_id.clone(), &path, &language).await {
        remove_partial(&path).await;
        return Err(e.into());
    }

    metrics::record_upload(bytes);
    info!(job_id = %job_id, bytes, language = %language, "Upload accepted");
    Ok(Json(UploadResponse { job_id }))
}

/// Consume every multipart field. A saved file is reported through `saved`
/// even when a later field fails, so the caller can remove it.
async fn read_fields(
    state: &AppState,
    multipart: &mut Multipart,
    saved: &mut Option<(JobId, PathBuf, u64)>,
    language: &mut String,
) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") if saved.is_none() => {
                *saved = Some(save_field(state, field).await?);
            }
            Some("language") => {
                let value = field.text().await.map_err(multipart_error)?;
                if !value.trim().is_empty() {
                    *language = value.trim().to_string();
                }
            }
            _ => {}
        }
    }
    Ok(())
}

async fn save_field(state: &AppState, mut field: Field<'_>) -> ApiResult<(JobId, PathBuf, u64)> {
    let filename = field
        .file_name()
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            metrics::record_upload_rejected("missing_filename");
            ApiError::bad_request("filename missing")
        })?;
    let ext = allowed_extension(&filename).ok_or_else(|| {
        metrics::record_upload_rejected("extension");
        ApiError::bad_request("only mp4/mov/mkv/m4v/webm files are allowed")
    })?;

    let uploads = state.config.uploads_dir();
    tokio::fs::create_dir_all(&uploads).await?;

    let job_id = JobId::new();
    let path = uploads.join(format!("{}.{}", job_id, ext));
    let limit = state.config.max_upload_bytes();

    match stream_to_file(&mut field, &path, limit).await {
        Ok(bytes) => Ok((job_id, path, bytes)),
        Err(e) => {
            remove_partial(&path).await;
            Err(e)
        }
    }
}

async fn stream_to_file(field: &mut Field<'_>, path: &Path, limit: u64) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        written += chunk.len() as u64;
        if written > limit {
            metrics::record_upload_rejected("too_large");
            return Err(too_large(limit));
        }
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(written)
}

fn too_large(limit: u64) -> ApiError {
    ApiError::PayloadTooLarge(format!("file too large (max {} MB)", limit / (1024 * 1024)))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        metrics::record_upload_rejected("too_large");
        ApiError::PayloadTooLarge("file too large".to_string())
    } else {
        ApiError::bad_request(e.body_text())
    }
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
        }
    }
}
