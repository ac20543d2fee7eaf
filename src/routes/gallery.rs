// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public gallery routes: folder listings, image proxy, connection check.

use crate::error::{AppError, Result};
use crate::models::FolderContent;
use crate::services::drive::{is_valid_item_id, ConnectionReport};
use crate::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Images are immutable per file id, so browsers may cache them forever.
const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/folders", get(get_root_folder))
        .route("/api/folders/{id}", get(get_folder))
        .route("/api/image/{id}", get(get_image))
        .route("/api/test", get(test_connection))
}

// ─── Folders ─────────────────────────────────────────────────

/// Contents of the configured root folder.
async fn get_root_folder(State(state): State<Arc<AppState>>) -> Result<Json<FolderContent>> {
    let content = state
        .drive
        .list_folder_contents(&state.config.root_folder_id)
        .await?;
    Ok(Json(content))
}

/// Contents of any folder by id.
async fn get_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FolderContent>> {
    validate_id(&id)?;
    let content = state.drive.list_folder_contents(&id).await?;
    Ok(Json(content))
}

// ─── Images ──────────────────────────────────────────────────

/// Stream an image's bytes from Drive.
async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response> {
    validate_id(&id)?;

    let image = state.drive.fetch_image(&id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL.to_string()),
        ],
        Body::from_stream(image.response.bytes_stream()),
    )
        .into_response())
}

// ─── Connection test ─────────────────────────────────────────

#[derive(Serialize)]
pub struct ConnectionTestResponse {
    pub success: bool,
    pub result: bool,
    #[serde(flatten)]
    pub report: ConnectionReport,
}

/// Check that the root folder can be listed with the service account.
async fn test_connection(State(state): State<Arc<AppState>>) -> Json<ConnectionTestResponse> {
    let report = state
        .drive
        .test_connection(&state.config.root_folder_id)
        .await;

    Json(ConnectionTestResponse {
        success: true,
        result: report.connected,
        report,
    })
}

fn validate_id(id: &str) -> Result<()> {
    if is_valid_item_id(id) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid item id: {}", id)))
    }
}
