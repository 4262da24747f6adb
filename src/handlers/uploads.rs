//! Photo upload handler

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{AppState, AppResult, AppError};
use crate::middleware::auth::UserContext;
use crate::storage::{check_upload, object_key, sanitize_folder};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Multipart upload: `file` plus optional `folder`
pub async fn upload(
    State(state): State<AppState>,
    user: UserContext,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("photo").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("folder") => {
                folder = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::ValidationError("No file provided".to_string()))?;

    check_upload(&content_type, bytes.len(), state.config.max_upload_bytes)?;
    let folder = sanitize_folder(folder.as_deref())?;
    let key = object_key(&folder, &file_name, chrono::Utc::now().timestamp_millis());

    let url = state.photos.put(&key, &bytes).await?;

    tracing::info!("User {} uploaded {} ({} bytes)", user.user_id, key, bytes.len());

    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::ValidationError(err.body_text())
    }
}
