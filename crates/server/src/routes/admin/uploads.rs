//! Admin image uploads.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::services::uploads::{self, StoredUpload, UploadError};
use crate::state::AppState;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

fn multipart_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::TooLarge {
            max: uploads::MAX_UPLOAD_BYTES,
        }
        .into();
    }
    AppError::BadRequest(err.body_text())
}

/// `POST /admin/api/uploads` - store one image from the `file` field.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredUpload>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let kind = uploads::detect_kind(field.content_type(), field.file_name())?;
        let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
        let stored = uploads::store(&state.config().upload_dir, kind, &bytes).await?;

        info!(file = %stored.file_name, size = stored.size, "Image uploaded");
        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(UploadError::MissingFile.into())
}
