use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use super::{ApiError, AppState};

const VIDEO_FIELD: &str = "video";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub bytes: usize,
}

/// Stores an uploaded video as-is under the upload directory, named after the
/// client's file name.
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Malformed upload: {err}")))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Upload is missing a file name".to_string()))?;

        tokio::fs::create_dir_all(&state.upload_dir)
            .await
            .map_err(|err| ApiError::Internal(format!("cannot create upload dir: {err}")))?;
        let target = state.upload_dir.join(&filename);
        let write_failed =
            |err: std::io::Error| ApiError::Internal(format!("cannot write {}: {err}", target.display()));

        let mut file = tokio::fs::File::create(&target).await.map_err(write_failed)?;
        let mut bytes = 0usize;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| ApiError::BadRequest(format!("Failed to read upload: {err}")))?
        {
            file.write_all(&chunk).await.map_err(write_failed)?;
            bytes += chunk.len();
        }
        file.flush().await.map_err(write_failed)?;

        tracing::info!(file = %filename, bytes, "stored video upload");
        return Ok(Json(UploadResponse { filename, bytes }));
    }

    Err(ApiError::BadRequest(format!(
        "No '{VIDEO_FIELD}' file in upload"
    )))
}
