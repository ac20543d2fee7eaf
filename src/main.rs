// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drive-Gallery API Server
//!
//! Serves a photo gallery out of a Google Drive folder using a service
//! account for all Drive access.

use drive_gallery::{
    config::Config,
    services::{DriveClient, DriveService, TokenCache},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        client_email = %config.service_account.client_email,
        root_folder_id = %config.root_folder_id,
        "Starting Drive-Gallery API"
    );

    // One token cache for the whole process, shared by every request
    let tokens = Arc::new(TokenCache::new(&config).expect("Failed to initialize token cache"));
    tracing::info!("Token cache initialized");

    let client = DriveClient::new(&config).expect("Failed to initialize Drive client");
    let drive = DriveService::new(client, tokens);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        drive,
    });

    // Build router
    let app = drive_gallery::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("drive_gallery=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
