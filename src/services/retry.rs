// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bounded retry for idempotent upstream calls.
//!
//! Only transport failures and 5xx responses are retried. A 4xx response is
//! returned to the caller untouched so auth rejections fail fast. When retries
//! run out on a 5xx, the last response is returned so its error body can be
//! reported.

use backon::{ExponentialBuilder, Retryable};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

static NETWORK_RETRY_POLICY: LazyLock<ExponentialBuilder> = LazyLock::new(|| {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_millis(400))
        .with_max_times(2)
        .with_jitter()
});

/// A failed attempt: either nothing came back, or the upstream answered 5xx.
enum Attempt {
    Transport(reqwest::Error),
    ServerError(reqwest::Response),
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attempt::Transport(err) => write!(f, "{}", err),
            Attempt::ServerError(response) => write!(f, "HTTP {}", response.status()),
        }
    }
}

/// Send the request built by `build`, rebuilding and resending it on
/// transient failure.
pub(crate) async fn send_with_retry<F>(
    upstream: &'static str,
    build: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let build = &build;

    let result = (move || async move {
        let response = build().send().await.map_err(Attempt::Transport)?;

        if response.status().is_server_error() {
            tracing::debug!(
                upstream,
                status = %response.status(),
                url = %response.url(),
                "Upstream server error (will retry)"
            );
            return Err(Attempt::ServerError(response));
        }

        Ok(response)
    })
    .retry(*NETWORK_RETRY_POLICY)
    .notify(|err: &Attempt, delay: Duration| {
        tracing::warn!(
            upstream,
            error = %err,
            delay_ms = delay.as_millis() as u64,
            "Retrying upstream request"
        );
    })
    .await;

    match result {
        Ok(response) | Err(Attempt::ServerError(response)) => Ok(response),
        Err(Attempt::Transport(err)) => Err(err),
    }
}
