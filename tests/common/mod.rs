// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test helpers: an in-process mock of the Google token and Drive
//! endpoints, a manual clock, and app/service builders pointed at the mock.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Form, Json, Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use drive_gallery::config::{Config, ServiceAccountKey};
use drive_gallery::routes::create_router;
use drive_gallery::services::{Clock, DriveClient, DriveService, TokenCache};
use drive_gallery::AppState;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/service_account_key.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/service_account_pub.pem");
pub const TEST_CLIENT_EMAIL: &str = "gallery@test-project.iam.gserviceaccount.com";
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()),
        })
    }

    pub fn advance(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Mutable state of the mock Google backend.
#[derive(Default)]
pub struct MockGoogle {
    pub token_requests: AtomicUsize,
    pub list_requests: AtomicUsize,
    /// Status returned by the token endpoint instead of success.
    pub token_failure: Mutex<Option<StatusCode>>,
    /// Delay before answering token requests (widens race windows).
    pub token_delay_ms: AtomicUsize,
    /// Assertions received by the token endpoint.
    pub assertions: Mutex<Vec<String>>,
    /// Bearer tokens seen on Drive calls.
    pub bearer_tokens: Mutex<Vec<String>>,
    /// Status returned by the listing endpoint instead of success.
    pub list_failure: Mutex<Option<StatusCode>>,
    /// Children per folder id, in provider order.
    pub children: Mutex<HashMap<String, Vec<Value>>>,
    /// Metadata per file id.
    pub items: Mutex<HashMap<String, Value>>,
    /// Ids whose metadata lookup answers 403.
    pub failing_items: Mutex<HashSet<String>>,
    /// Tokens the Drive endpoints reject with 401.
    pub revoked_tokens: Mutex<HashSet<String>>,
    /// Media content per file id.
    pub media: Mutex<HashMap<String, (String, Vec<u8>)>>,
    /// Created file metadata, in creation order.
    pub created: Mutex<Vec<Value>>,
    /// Uploaded content sizes per file id.
    pub uploaded: Mutex<HashMap<String, usize>>,
}

impl MockGoogle {
    pub fn token_count(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn add_folder(&self, id: &str, name: &str, parent: Option<&str>) {
        let item = item_json(id, name, FOLDER_MIME, parent);
        self.insert(item, parent);
    }

    pub fn add_file(&self, id: &str, name: &str, mime: &str, parent: &str) {
        let item = item_json(id, name, mime, Some(parent));
        self.insert(item, Some(parent));
    }

    fn insert(&self, item: Value, parent: Option<&str>) {
        let id = item["id"].as_str().unwrap_or_default().to_string();
        if let Some(parent) = parent {
            self.children
                .lock()
                .unwrap()
                .entry(parent.to_string())
                .or_default()
                .push(item.clone());
        }
        self.items.lock().unwrap().insert(id, item);
    }
}

pub fn item_json(id: &str, name: &str, mime: &str, parent: Option<&str>) -> Value {
    let mut item = json!({
        "id": id,
        "name": name,
        "mimeType": mime,
        "webViewLink": format!("https://drive.google.com/file/d/{id}/view"),
    });
    if let Some(parent) = parent {
        item["parents"] = json!([parent]);
    }
    if mime.starts_with("image/") {
        item["thumbnailLink"] = json!(format!("https://lh3.googleusercontent.com/{id}=s220"));
    }
    item
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

fn drive_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": status.as_u16(), "message": message}})),
    )
        .into_response()
}

/// Record the bearer token and reject revoked ones.
fn check_bearer(state: &MockGoogle, headers: &HeaderMap) -> Option<Response> {
    let token = bearer(headers);
    state.bearer_tokens.lock().unwrap().push(token.clone());
    if token.is_empty() || state.revoked_tokens.lock().unwrap().contains(&token) {
        return Some(drive_error(StatusCode::UNAUTHORIZED, "Invalid Credentials"));
    }
    None
}

async fn token_handler(
    State(state): State<Arc<MockGoogle>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;

    let delay = state.token_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay as u64)).await;
    }

    if form.get("grant_type").map(String::as_str)
        != Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        )
            .into_response();
    }

    if let Some(assertion) = form.get("assertion") {
        state.assertions.lock().unwrap().push(assertion.clone());
    }

    if let Some(status) = *state.token_failure.lock().unwrap() {
        return (
            status,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid JWT Signature."})),
        )
            .into_response();
    }

    Json(json!({
        "access_token": format!("token-{n}"),
        "expires_in": 3600,
        "token_type": "Bearer",
    }))
    .into_response()
}

/// Pull the folder id out of `'<id>' in parents and trashed = false`.
fn parent_from_query(q: &str) -> Option<String> {
    let rest = q.strip_prefix('\'')?;
    let end = rest.find('\'')?;
    Some(rest[..end].to_string())
}

async fn list_handler(
    State(state): State<Arc<MockGoogle>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.list_requests.fetch_add(1, Ordering::SeqCst);

    if let Some(rejection) = check_bearer(&state, &headers) {
        return rejection;
    }

    if let Some(status) = *state.list_failure.lock().unwrap() {
        return drive_error(status, "The user does not have sufficient permissions for this file.");
    }

    let Some(parent) = query.get("q").and_then(|q| parent_from_query(q)) else {
        return drive_error(StatusCode::BAD_REQUEST, "Invalid query");
    };

    let files = state
        .children
        .lock()
        .unwrap()
        .get(&parent)
        .cloned()
        .unwrap_or_default();

    Json(json!({ "files": files })).into_response()
}

async fn file_handler(
    State(state): State<Arc<MockGoogle>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(rejection) = check_bearer(&state, &headers) {
        return rejection;
    }

    if query.get("alt").map(String::as_str) == Some("media") {
        return match state.media.lock().unwrap().get(&id).cloned() {
            Some((content_type, bytes)) => {
                ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
            }
            None => drive_error(StatusCode::NOT_FOUND, &format!("File not found: {id}.")),
        };
    }

    if state.failing_items.lock().unwrap().contains(&id) {
        return drive_error(StatusCode::FORBIDDEN, "Access denied");
    }

    match state.items.lock().unwrap().get(&id).cloned() {
        Some(item) => Json(item).into_response(),
        None => drive_error(StatusCode::NOT_FOUND, &format!("File not found: {id}.")),
    }
}

async fn create_handler(
    State(state): State<Arc<MockGoogle>>,
    headers: HeaderMap,
    Json(metadata): Json<Value>,
) -> Response {
    if let Some(rejection) = check_bearer(&state, &headers) {
        return rejection;
    }

    let mut created = state.created.lock().unwrap();
    created.push(metadata);
    Json(json!({ "id": format!("new-{}", created.len()) })).into_response()
}

async fn upload_handler(
    State(state): State<Arc<MockGoogle>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(rejection) = check_bearer(&state, &headers) {
        return rejection;
    }

    state.uploaded.lock().unwrap().insert(id.clone(), body.len());
    Json(json!({ "id": id })).into_response()
}

/// Start the mock on an ephemeral port. Returns its state and base URL.
pub async fn spawn_mock_google() -> (Arc<MockGoogle>, String) {
    let state = Arc::new(MockGoogle::default());

    let app = Router::new()
        .route("/token", post(token_handler))
        .route("/drive/v3/files", get(list_handler).post(create_handler))
        .route("/drive/v3/files/{id}", get(file_handler))
        .route("/upload/drive/v3/files/{id}", patch(upload_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (state, format!("http://{}", addr))
}

/// Config pointing every Google endpoint at the mock.
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::test_default();
    config.service_account = ServiceAccountKey::new(TEST_CLIENT_EMAIL, TEST_PRIVATE_KEY);
    config.root_folder_id = "root".to_string();
    config.token_url = format!("{base_url}/token");
    config.drive_api_url = format!("{base_url}/drive/v3");
    config.drive_upload_url = format!("{base_url}/upload/drive/v3");
    config.http_timeout = std::time::Duration::from_secs(5);
    config
}

/// Token cache against the mock, driven by the given clock.
pub fn test_token_cache(config: &Config, clock: Arc<ManualClock>) -> Arc<TokenCache> {
    Arc::new(
        TokenCache::new(config)
            .expect("token cache")
            .with_clock(clock),
    )
}

/// Drive service against the mock.
pub fn test_drive_service(config: &Config, tokens: Arc<TokenCache>) -> DriveService {
    DriveService::new(DriveClient::new(config).expect("drive client"), tokens)
}

/// Create a test app wired to the mock. Returns the router and shared state.
pub fn create_test_app(base_url: &str) -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(test_config(base_url))
}

/// Create a test app from an adjusted config.
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let tokens = test_token_cache(&config, ManualClock::new());
    let drive = test_drive_service(&config, tokens);

    let state = Arc::new(AppState { config, drive });

    (create_router(state.clone()), state)
}

/// Gallery tree used by several tests:
///
/// ```text
/// root (Photos)
/// ├── trip (Trip 2025)
/// │   └── day1 (Day 1)
/// │       ├── beach.png, sunset.jpg
/// │       ├── evening (folder)
/// │       └── notes.pdf
/// └── cover.jpg
/// ```
pub fn seed_gallery(mock: &MockGoogle) {
    mock.add_folder("root", "Photos", None);
    mock.add_folder("trip", "Trip 2025", Some("root"));
    mock.add_file("cover", "cover.jpg", "image/jpeg", "root");
    mock.add_folder("day1", "Day 1", Some("trip"));
    mock.add_file("beach", "beach.png", "image/png", "day1");
    mock.add_folder("evening", "Evening", Some("day1"));
    mock.add_file("notes", "notes.pdf", "application/pdf", "day1");
    mock.add_file("sunset", "sunset.jpg", "image/jpeg", "day1");
}
