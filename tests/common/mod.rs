// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Response;
use portfolio_api::config::Config;
use portfolio_api::db::FirestoreDb;
use portfolio_api::middleware::auth::{create_jwt, SESSION_COOKIE};
use portfolio_api::routes::create_router;
use portfolio_api::services::{EmailService, IdentityService, StaticAccount, StorageService};
use portfolio_api::AppState;
use std::sync::Arc;

pub const ADMIN_UID: &str = "admin-uid";
pub const ADMIN_EMAIL: &str = "owner@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery";

pub const VISITOR_UID: &str = "visitor-uid";
pub const VISITOR_EMAIL: &str = "visitor@example.com";
pub const VISITOR_PASSWORD: &str = "visitor-password";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Build an app around the given database, with in-memory storage, two
/// static accounts and an email API that is never reachable.
#[allow(dead_code)]
pub fn create_test_app_with_db(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let storage = StorageService::new_in_memory(&config.storage_bucket);
    let identity = IdentityService::new_static(vec![
        StaticAccount::new(ADMIN_UID, ADMIN_EMAIL, ADMIN_PASSWORD),
        StaticAccount::new(VISITOR_UID, VISITOR_EMAIL, VISITOR_PASSWORD),
    ]);
    let email = EmailService::new(config.email.clone());

    let state = Arc::new(AppState::new(config, db, storage, identity, email));
    (create_router(state.clone()), state)
}

/// Create a test app with an in-memory database where `ADMIN_UID` is an admin.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let db = FirestoreDb::new_in_memory();
    db.grant_admin(ADMIN_UID).await.expect("grant admin");
    create_test_app_with_db(db)
}

/// `Cookie` header value carrying a session for `uid`.
#[allow(dead_code)]
pub fn session_cookie(state: &AppState, uid: &str, email: &str) -> String {
    let token = create_jwt(uid, Some(email), &state.config.jwt_signing_key).expect("jwt");
    format!("{}={}", SESSION_COOKIE, token)
}

/// Session cookie for the admin account.
#[allow(dead_code)]
pub fn admin_cookie(state: &AppState) -> String {
    session_cookie(state, ADMIN_UID, ADMIN_EMAIL)
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// All `Set-Cookie` header values on a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// The `Set-Cookie` value for cookie `name`, if any.
#[allow(dead_code)]
pub fn find_cookie<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    cookies
        .iter()
        .find(|cookie| cookie.starts_with(&format!("{name}=")))
}

/// Multipart body with a single file part named `file`.
#[allow(dead_code)]
pub fn multipart_file(file_name: &str, content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "portfolio-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
