// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upload route for admins.

use crate::error::{AppError, Result};
use crate::middleware::auth::AdminSession;
use crate::services::drive::{is_valid_item_id, UploadFile};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;

/// Maximum size of a single file (10 MiB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// Maximum size of all files in one request (50 MiB).
pub const MAX_TOTAL_SIZE: usize = 50 * 1024 * 1024;
/// Accepted upload MIME types.
pub const ALLOWED_FILE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Room for multipart framing and the folder id field.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Upload routes (require admin token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/upload", post(upload))
        .layer(DefaultBodyLimit::max(MAX_TOTAL_SIZE + MULTIPART_OVERHEAD))
}

#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uploaded: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Upload images into a folder.
///
/// Expects multipart fields `folderId` and one or more `files`. All files are
/// validated before anything is sent to Drive; uploads then run concurrently.
async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AdminSession>,
    multipart: Multipart,
) -> Result<Response> {
    let (folder_id, files) = read_upload_form(multipart).await?;

    tracing::info!(
        role = %session.role,
        folder_id = %folder_id,
        count = files.len(),
        "Upload requested"
    );

    let uploads = files
        .into_iter()
        .map(|file| state.drive.upload_image(&folder_id, file));
    let results = join_all(uploads).await;

    let mut uploaded = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(id) => uploaded.push(id),
            Err(e) => {
                tracing::error!(error = %e, "Upload failed");
                errors.push(e.to_string());
            }
        }
    }

    if !errors.is_empty() {
        let body = UploadResponse {
            success: false,
            uploaded,
            errors,
        };
        return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response());
    }

    Ok(Json(UploadResponse {
        success: true,
        uploaded,
        errors,
    })
    .into_response())
}

/// Read and validate the multipart form.
async fn read_upload_form(mut multipart: Multipart) -> Result<(String, Vec<UploadFile>)> {
    let mut folder_id: Option<String> = None;
    let mut files = Vec::new();
    let mut total_size = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("folderId") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid folderId: {}", e)))?;
                folder_id = Some(value.trim().to_string());
            }
            Some("files") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?
                    .to_vec();

                total_size += content.len();
                files.push(validate_file(UploadFile {
                    name,
                    mime_type,
                    content,
                })?);
            }
            _ => {}
        }
    }

    let folder_id = folder_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("No folder ID provided".to_string()))?;
    if !is_valid_item_id(&folder_id) {
        return Err(AppError::BadRequest(format!("Invalid folder ID: {}", folder_id)));
    }

    if files.is_empty() {
        return Err(AppError::BadRequest("No files provided".to_string()));
    }

    if total_size > MAX_TOTAL_SIZE {
        return Err(AppError::BadRequest(
            "Total upload size exceeds limit".to_string(),
        ));
    }

    Ok((folder_id, files))
}

/// Enforce per-file size and type limits.
fn validate_file(file: UploadFile) -> Result<UploadFile> {
    if file.content.len() > MAX_FILE_SIZE {
        return Err(AppError::BadRequest(format!(
            "File {} exceeds size limit",
            file.name
        )));
    }

    if !ALLOWED_FILE_TYPES.contains(&file.mime_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "File {} has unsupported type",
            file.name
        )));
    }

    Ok(file)
}
