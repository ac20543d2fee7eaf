// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod gallery;
pub mod upload;

use crate::middleware::auth::require_auth;
use crate::AppState;
use axum::http::{header, request::Parts, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Hosts accepted on any port for local development.
const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Whether a browser `Origin` may make credentialed requests: the configured
/// frontend exactly, or an http(s) origin whose host is exactly a local host.
pub fn is_allowed_origin(origin: &str, frontend_url: &str) -> bool {
    if origin == frontend_url.trim_end_matches('/') {
        return true;
    }

    let Ok(url) = Url::parse(origin) else {
        return false;
    };

    matches!(url.scheme(), "http" | "https")
        && url.username().is_empty()
        && url.password().is_none()
        && url
            .host_str()
            .is_some_and(|host| LOCAL_HOSTS.contains(&host))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Credentialed CORS: only the frontend and local dev servers
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| is_allowed_origin(origin, &frontend_url))
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(gallery::routes());

    // Upload routes (admin token required)
    let protected_routes =
        upload::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
