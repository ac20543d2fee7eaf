// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin token middleware guarding uploads.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie carrying the admin token when not sent as a bearer header.
pub const TOKEN_COOKIE: &str = "gallery_token";

/// Role required to upload.
pub const ADMIN_ROLE: &str = "admin";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Granted role
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Verified admin session extracted from the token.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub role: String,
}

/// Middleware that requires a valid admin token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let claims = verify_admin_token(&token, &state.config.jwt_secret).ok_or_else(|| {
        tracing::warn!("Rejected upload request with invalid admin token");
        StatusCode::UNAUTHORIZED
    })?;

    request
        .extensions_mut()
        .insert(AdminSession { role: claims.role });

    Ok(next.run(request).await)
}

/// Decode an HS256 token and check it grants the admin role.
pub fn verify_admin_token(token: &str, secret: &[u8]) -> Option<Claims> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &key, &validation).ok()?;
    (token_data.claims.role == ADMIN_ROLE).then_some(token_data.claims)
}
