// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod drive;

pub use drive::{BreadcrumbItem, DriveItem, FolderContent, FolderRef, ImageFile};
