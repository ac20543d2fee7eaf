// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed credentials or folder id. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Key import or signing failure. Never retried.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Token exchange rejected or unreachable.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Drive listing/metadata/upload call rejected or unreachable.
    #[error("Drive API error: {0}")]
    DriveApi(String),

    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker message for a rejected bearer token (HTTP 401 from Drive).
    pub const DRIVE_TOKEN_ERROR: &'static str = "Drive rejected access token";

    /// Whether this error means the cached bearer token is no longer accepted.
    pub fn is_drive_token_error(&self) -> bool {
        matches!(self, AppError::DriveApi(msg) if msg == Self::DRIVE_TOKEN_ERROR)
    }

    /// Map a transport failure on a Drive call, keeping timeouts distinct.
    pub(crate) fn drive_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::DriveApi(err.to_string())
        }
    }

    /// Map a transport failure on the token exchange, keeping timeouts distinct.
    pub(crate) fn auth_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Authentication(format!("Token request failed: {}", err))
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error",
                    None,
                )
            }
            AppError::Crypto(msg) => {
                tracing::error!(error = %msg, "Crypto error");
                (StatusCode::INTERNAL_SERVER_ERROR, "crypto_error", None)
            }
            AppError::Authentication(msg) => (
                StatusCode::BAD_GATEWAY,
                "authentication_error",
                Some(msg.clone()),
            ),
            AppError::DriveApi(msg) => (StatusCode::BAD_GATEWAY, "drive_error", Some(msg.clone())),
            AppError::Timeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                "upstream_timeout",
                Some(msg.clone()),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
