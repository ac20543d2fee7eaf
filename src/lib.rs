// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Drive-Gallery: a photo gallery backed by a Google Drive folder
//!
//! This crate provides the backend API that lists Drive folders, proxies
//! images, and accepts uploads using a service account.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::DriveService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub drive: DriveService,
}
