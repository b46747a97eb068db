// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin sign-in, sign-out and session routes.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, session_from_request, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::session::{Session, SessionUser};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(get_session))
}

/// Login form.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Session cookie; `Secure` unless the frontend is served over plain http (local dev).
fn session_cookie(config: &Config, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(config.frontend_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Email/password sign-in. On success the session cookie is set and the
/// settled session returned; any failure gives the fixed invalid-credentials
/// error and leaves the visitor signed out.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Session>)> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user = match state.identity.sign_in_with_password(email, &req.password).await {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(error = %e, "Sign-in failed");
            return Err(AppError::InvalidCredentials);
        }
    };

    let token = create_jwt(&user.uid, user.email.as_deref(), &state.config.jwt_signing_key)?;
    let session = Session::resolve(
        Some(SessionUser {
            uid: user.uid.clone(),
            email: user.email,
        }),
        &state.db,
    )
    .await;

    tracing::info!(uid = %user.uid, is_admin = session.is_admin, "Signed in");

    let jar = jar.add(session_cookie(&state.config, token, SESSION_TTL_SECS as i64));
    Ok((jar, Json(session)))
}

/// Sign out: expire the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (StatusCode, CookieJar) {
    let jar = jar.add(session_cookie(&state.config, String::new(), 0));
    (StatusCode::NO_CONTENT, jar)
}

/// Current session as the route guard sees it.
async fn get_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Json<Session> {
    Json(session_from_request(&state, &jar, &headers).await)
}
