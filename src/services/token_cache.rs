// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-wide bearer token for the Drive service account.
//!
//! Handles:
//! - Signing a JWT-bearer assertion and exchanging it for an access token
//! - Caching the token until shortly before Google expires it
//! - Single-flight refresh (concurrent callers share one exchange)

use crate::config::{Config, ServiceAccountKey};
use crate::error::AppError;
use crate::services::assertion::AssertionSigner;
use crate::services::retry::send_with_retry;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// How long a fetched token is trusted. Google issues tokens valid for
/// 3600s; the difference is the safety margin.
pub const TOKEN_CACHE_LIFETIME_SECS: i64 = 3500;

/// Minimum gap kept below a shorter provider-reported lifetime.
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 100;

/// Shortest lifetime derived from the safety margin before falling back to
/// half the provider's validity.
const MIN_CACHE_LIFETIME_SECS: i64 = 60;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cached access token with expiry information.
#[derive(Clone)]
struct Credential {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Token endpoint success response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Token endpoint error response (`{"error": ..., "error_description": ...}`).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Owns the single cached credential. Construct once and share via `Arc`.
pub struct TokenCache {
    http: reqwest::Client,
    token_url: String,
    key: ServiceAccountKey,
    signer: AssertionSigner,
    clock: Arc<dyn Clock>,
    credential: RwLock<Option<Credential>>,
    /// Serializes refreshes so only one exchange is in flight.
    refresh_lock: Mutex<()>,
}

impl TokenCache {
    /// Create a token cache for the configured service account.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed building token HTTP client")?;

        Ok(Self {
            http,
            token_url: config.token_url.clone(),
            key: config.service_account.clone(),
            signer: AssertionSigner::new(config.token_url.clone()),
            clock: Arc::new(SystemClock),
            credential: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Replace the clock used for expiry decisions and assertion timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get a valid access token, exchanging a new assertion if the cached one
    /// is missing or expired.
    ///
    /// 1. Check the cache under a read lock (fast path)
    /// 2. Acquire the refresh lock
    /// 3. Re-check the cache (another task may have refreshed)
    /// 4. Sign, exchange, and replace the credential wholesale
    ///
    /// On failure the previous credential (if any) is left as it was.
    pub async fn get_access_token(&self) -> Result<String, AppError> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let credential = self.fetch_credential().await?;
        let token = credential.token.clone();
        *self.credential.write().await = Some(credential);

        Ok(token)
    }

    /// Drop the cached credential if it is still `rejected`, so the next call
    /// re-acquires one.
    ///
    /// Callers that saw the same rejected token concurrently clear it only
    /// once; a token refreshed in the meantime is kept.
    pub async fn invalidate(&self, rejected: &str) {
        let _guard = self.refresh_lock.lock().await;
        let mut credential = self.credential.write().await;
        if credential.as_ref().is_some_and(|c| c.token == rejected) {
            *credential = None;
            tracing::info!("Drive access token invalidated");
        } else {
            tracing::debug!("Rejected access token already replaced");
        }
    }

    /// Expiry of the cached credential, if one is held.
    pub async fn cached_expiry(&self) -> Option<DateTime<Utc>> {
        self.credential
            .read()
            .await
            .as_ref()
            .map(|credential| credential.expires_at)
    }

    async fn cached_token(&self) -> Option<String> {
        let now = self.clock.now();
        self.credential
            .read()
            .await
            .as_ref()
            .filter(|credential| now < credential.expires_at)
            .map(|credential| credential.token.clone())
    }

    async fn fetch_credential(&self) -> Result<Credential, AppError> {
        let now = self.clock.now();

        tracing::info!(
            client_email = %self.key.client_email,
            key_len = self.key.private_key.len(),
            "Requesting new Drive access token"
        );

        let assertion = self.signer.sign_at(&self.key, now)?;

        let response = send_with_retry("oauth2", || {
            self.http.post(&self.token_url).form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
        })
        .await
        .map_err(AppError::auth_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = token_error_message(&body).unwrap_or_else(|| status.to_string());
            tracing::error!(status = %status, error = %message, "Token exchange rejected");
            return Err(AppError::Authentication(format!(
                "Token exchange failed with status {}: {}",
                status, message
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            AppError::Authentication(format!("Failed to parse token response: {}", e))
        })?;

        let lifetime = cache_lifetime_secs(token_response.expires_in);
        let expires_at = now + Duration::seconds(lifetime);

        tracing::info!(
            expires_at = %expires_at.to_rfc3339(),
            "Drive access token refreshed and cached"
        );

        Ok(Credential {
            token: token_response.access_token,
            expires_at,
        })
    }
}

/// Cache lifetime: 3500s, shortened if the provider reports a shorter validity.
/// Tokens too short-lived for the safety margin are kept for half their
/// validity so they still serve more than one call.
fn cache_lifetime_secs(expires_in: Option<i64>) -> i64 {
    match expires_in {
        Some(secs) if secs > 0 => {
            let lifetime = secs - EXPIRY_SAFETY_MARGIN_SECS;
            if lifetime < MIN_CACHE_LIFETIME_SECS {
                tracing::warn!(
                    expires_in = secs,
                    "Provider issued a short-lived access token"
                );
                (secs / 2).max(1)
            } else {
                TOKEN_CACHE_LIFETIME_SECS.min(lifetime)
            }
        }
        _ => TOKEN_CACHE_LIFETIME_SECS,
    }
}

fn token_error_message(body: &str) -> Option<String> {
    let parsed: TokenErrorResponse = serde_json::from_str(body).ok()?;
    match (parsed.error, parsed.error_description) {
        (Some(error), Some(description)) => Some(format!("{}: {}", error, description)),
        (Some(error), None) => Some(error),
        (None, Some(description)) => Some(description),
        (None, None) => None,
    }
}
