// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Drive API client for listing folders, proxying images and uploads.
//!
//! Handles:
//! - Folder listing (images and subfolders)
//! - Breadcrumb resolution via single-file metadata lookups
//! - Image download streaming
//! - Two-step uploads (metadata create, then media PATCH)

use crate::config::Config;
use crate::error::AppError;
use crate::models::drive::{partition_items, DriveFileList, DriveItem, FolderContent};
use crate::services::breadcrumb::{walk_breadcrumb, BreadcrumbWalk, DEFAULT_MAX_DEPTH};
use crate::services::retry::send_with_retry;
use crate::services::token_cache::TokenCache;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

/// Fields requested for each child when listing a folder.
const LIST_FIELDS: &str =
    "files(id,name,mimeType,thumbnailLink,webContentLink,webViewLink,parents)";
/// Fields requested per ancestor during the breadcrumb walk.
const BREADCRUMB_FIELDS: &str = "id,name,parents";
/// Single page; folders with more children are cut off.
const LIST_PAGE_SIZE: u32 = 1000;

/// Drive v3 API client.
#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_url: String,
    upload_url: String,
}

impl DriveClient {
    /// Create a Drive client against the configured endpoints.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed building Drive HTTP client")?;

        Ok(Self {
            http,
            api_url: config.drive_api_url.trim_end_matches('/').to_string(),
            upload_url: config.drive_upload_url.trim_end_matches('/').to_string(),
        })
    }

    /// List non-trashed direct children of a folder, across shared drives.
    pub async fn list_children(
        &self,
        access_token: &str,
        folder_id: &str,
    ) -> Result<Vec<DriveItem>, AppError> {
        let url = format!("{}/files", self.api_url);
        let query = parent_query(folder_id);
        let page_size = LIST_PAGE_SIZE.to_string();

        let response = send_with_retry("drive", || {
            self.http.get(&url).bearer_auth(access_token).query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
        })
        .await
        .map_err(AppError::drive_transport)?;

        let list: DriveFileList = self.check_response_json(response).await?;
        Ok(list.files)
    }

    /// Get selected metadata fields of a single file or folder.
    pub async fn get_metadata(
        &self,
        access_token: &str,
        file_id: &str,
        fields: &str,
    ) -> Result<DriveItem, AppError> {
        let url = self.file_url(file_id);
        self.get_json(&url, access_token, &[("fields", fields), ("supportsAllDrives", "true")])
            .await
    }

    /// Start downloading a file's content. The caller streams the body.
    pub async fn download(
        &self,
        access_token: &str,
        file_id: &str,
    ) -> Result<reqwest::Response, AppError> {
        let url = self.file_url(file_id);

        let response = send_with_retry("drive", || {
            self.http
                .get(&url)
                .bearer_auth(access_token)
                .query(&[("alt", "media"), ("supportsAllDrives", "true")])
        })
        .await
        .map_err(AppError::drive_transport)?;

        self.check_response(response).await
    }

    /// Create a file's metadata entry inside `folder_id`. Returns the new id.
    pub async fn create_file(
        &self,
        access_token: &str,
        name: &str,
        folder_id: &str,
        mime_type: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/files", self.api_url);
        let metadata = NewFileMetadata {
            name,
            parents: [folder_id],
            mime_type,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .query(&[("supportsAllDrives", "true")])
            .json(&metadata)
            .send()
            .await
            .map_err(AppError::drive_transport)?;

        let created: CreatedFile = self.check_response_json(response).await?;
        Ok(created.id)
    }

    /// Upload the content of a previously created file.
    pub async fn upload_content(
        &self,
        access_token: &str,
        file_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/files/{}",
            self.upload_url,
            urlencoding::encode(file_id)
        );

        let response = self
            .http
            .patch(&url)
            .bearer_auth(access_token)
            .query(&[("uploadType", "media"), ("supportsAllDrives", "true")])
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(content)
            .send()
            .await
            .map_err(AppError::drive_transport)?;

        self.check_response(response).await?;
        Ok(())
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_url, urlencoding::encode(file_id))
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let response = send_with_retry("drive", || {
            self.http.get(url).bearer_auth(access_token).query(query)
        })
        .await
        .map_err(AppError::drive_transport)?;

        self.check_response_json(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Unauthorized - token revoked or expired early
        if status.as_u16() == 401 {
            tracing::warn!("Drive rejected access token (401)");
            return Err(AppError::DriveApi(AppError::DRIVE_TOKEN_ERROR.to_string()));
        }

        let message = drive_error_message(&body).unwrap_or_else(|| status.to_string());
        tracing::warn!(status = %status, error = %message, "Drive API request failed");
        Err(AppError::DriveApi(format!("HTTP {}: {}", status.as_u16(), message)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        self.check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::DriveApi(format!("JSON parse error: {}", e)))
    }
}

/// Body of a metadata create request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewFileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

/// Drive error envelope: `{"error": {"code": 403, "message": "..."}}`.
#[derive(Deserialize)]
struct DriveErrorEnvelope {
    error: DriveErrorBody,
}

#[derive(Deserialize)]
struct DriveErrorBody {
    message: Option<String>,
}

fn drive_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<DriveErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
}

/// Build the `files.list` query selecting live children of `folder_id`.
fn parent_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}' in parents and trashed = false", escaped)
}

/// Whether `id` looks like a Drive file id (letters, digits, `-`, `_`).
pub fn is_valid_item_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 256
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// ─────────────────────────────────────────────────────────────────────────────
// DriveService - High-level service with token management
// ─────────────────────────────────────────────────────────────────────────────

/// An image ready to stream back to the browser.
pub struct ImageDownload {
    pub content_type: String,
    pub response: reqwest::Response,
}

/// A validated file waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Result of a connectivity check against the root folder.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folders: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// High-level Drive service: obtains tokens from the shared cache and
/// assembles gallery views from raw API calls.
#[derive(Clone)]
pub struct DriveService {
    client: DriveClient,
    tokens: Arc<TokenCache>,
    max_breadcrumb_depth: usize,
}

impl DriveService {
    pub fn new(client: DriveClient, tokens: Arc<TokenCache>) -> Self {
        Self {
            client,
            tokens,
            max_breadcrumb_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the breadcrumb depth bound.
    pub fn with_max_breadcrumb_depth(mut self, max_depth: usize) -> Self {
        self.max_breadcrumb_depth = max_depth;
        self
    }

    /// The shared token cache.
    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    /// List a folder: images, subfolders, and the root-first breadcrumb.
    ///
    /// Listing failures fail the whole call. Breadcrumb failures only shorten
    /// the breadcrumb.
    pub async fn list_folder_contents(&self, folder_id: &str) -> Result<FolderContent, AppError> {
        if folder_id.trim().is_empty() {
            return Err(AppError::Configuration("Folder id is empty".to_string()));
        }

        tracing::debug!(folder_id = %folder_id, "Listing folder contents");

        let items = self
            .authorized(|token| async move { self.client.list_children(&token, folder_id).await })
            .await?;
        let total = items.len();
        let (files, folders) = partition_items(items);

        let breadcrumb = self.folder_breadcrumb(folder_id).await.into_items();

        tracing::info!(
            folder_id = %folder_id,
            total,
            files = files.len(),
            folders = folders.len(),
            depth = breadcrumb.len(),
            "Folder contents listed"
        );

        Ok(FolderContent {
            files,
            folders,
            breadcrumb,
        })
    }

    /// Walk from `folder_id` up to the root.
    pub async fn folder_breadcrumb(&self, folder_id: &str) -> BreadcrumbWalk {
        walk_breadcrumb(folder_id, self.max_breadcrumb_depth, |id| async move {
            self.authorized(|token| {
                let id = id.clone();
                async move {
                    self.client
                        .get_metadata(&token, &id, BREADCRUMB_FIELDS)
                        .await
                }
            })
            .await
        })
        .await
    }

    /// Fetch an image for proxying, using the stored MIME type when known.
    pub async fn fetch_image(&self, file_id: &str) -> Result<ImageDownload, AppError> {
        let metadata = self
            .authorized(|token| async move {
                self.client.get_metadata(&token, file_id, "id,mimeType").await
            })
            .await?;

        let response = self
            .authorized(|token| async move { self.client.download(&token, file_id).await })
            .await?;

        let content_type = Some(metadata.mime_type)
            .filter(|m| !m.is_empty())
            .or_else(|| {
                response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "image/jpeg".to_string());

        Ok(ImageDownload {
            content_type,
            response,
        })
    }

    /// Upload one file into `folder_id`. Returns the new file id.
    pub async fn upload_image(&self, folder_id: &str, file: UploadFile) -> Result<String, AppError> {
        let token = self.tokens.get_access_token().await?;

        let file_id = self
            .client
            .create_file(&token, &file.name, folder_id, &file.mime_type)
            .await
            .map_err(|e| upload_error(&file.name, "create metadata", e))?;

        let size = file.content.len();
        self.client
            .upload_content(&token, &file_id, &file.mime_type, file.content)
            .await
            .map_err(|e| upload_error(&file.name, "upload content", e))?;

        tracing::info!(
            folder_id = %folder_id,
            file_id = %file_id,
            name = %file.name,
            size,
            "Image uploaded"
        );

        Ok(file_id)
    }

    /// Check that the root folder can be listed.
    pub async fn test_connection(&self, root_folder_id: &str) -> ConnectionReport {
        match self.list_folder_contents(root_folder_id).await {
            Ok(content) => {
                tracing::info!(
                    files = content.files.len(),
                    folders = content.folders.len(),
                    "Successfully connected to Google Drive"
                );
                ConnectionReport {
                    connected: true,
                    files: Some(content.files.len()),
                    folders: Some(content.folders.len()),
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Drive connection test failed");
                ConnectionReport {
                    connected: false,
                    files: None,
                    folders: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Run `op` with a cached token. If Drive rejects the token, drop it from
    /// the cache and retry once with a fresh one.
    async fn authorized<T, F, Fut>(&self, op: F) -> Result<T, AppError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let token = self.tokens.get_access_token().await?;
        match op(token.clone()).await {
            Err(e) if e.is_drive_token_error() => {
                tracing::info!("Retrying Drive request with a fresh access token");
                self.tokens.invalidate(&token).await;
                let token = self.tokens.get_access_token().await?;
                op(token).await
            }
            result => result,
        }
    }
}

fn upload_error(name: &str, step: &str, err: AppError) -> AppError {
    match err {
        AppError::DriveApi(msg) => AppError::DriveApi(format!("Failed to {} for {}: {}", step, name, msg)),
        other => other,
    }
}
