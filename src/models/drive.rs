// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drive items as returned by the API, and the gallery view built from them.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Raw file resource from the Drive v3 API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    pub thumbnail_link: Option<String>,
    pub web_content_link: Option<String>,
    pub web_view_link: Option<String>,
    pub parents: Option<Vec<String>>,
}

impl DriveItem {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// First parent id, if any. Drive items have at most one parent.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents
            .as_deref()
            .and_then(|p| p.first())
            .map(String::as_str)
    }
}

/// Response of `files.list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveFileList {
    #[serde(default)]
    pub files: Vec<DriveItem>,
}

/// An image shown in the gallery grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ImageFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub thumbnail_link: Option<String>,
    pub web_content_link: Option<String>,
    pub view_link: String,
    pub parents: Option<Vec<String>>,
}

impl From<DriveItem> for ImageFile {
    fn from(item: DriveItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            mime_type: item.mime_type,
            thumbnail_link: item.thumbnail_link,
            web_content_link: item.web_content_link,
            view_link: item.web_view_link.unwrap_or_default(),
            parents: item.parents,
        }
    }
}

/// A subfolder link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

/// One ancestor in the navigation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BreadcrumbItem {
    pub id: String,
    pub name: String,
}

/// Everything needed to render one folder page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FolderContent {
    pub files: Vec<ImageFile>,
    pub folders: Vec<FolderRef>,
    /// Root first, requested folder last.
    pub breadcrumb: Vec<BreadcrumbItem>,
}

/// Split listed items into images and subfolders, keeping provider order.
/// Anything else (documents, PDFs, shortcuts) is dropped.
pub fn partition_items(items: Vec<DriveItem>) -> (Vec<ImageFile>, Vec<FolderRef>) {
    let mut files = Vec::new();
    let mut folders = Vec::new();

    for item in items {
        if item.is_image() {
            files.push(ImageFile::from(item));
        } else if item.is_folder() {
            folders.push(FolderRef {
                id: item.id,
                name: item.name,
            });
        }
    }

    (files, folders)
}
