// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT session tokens and the admin route guard middleware.

use crate::error::AppError;
use crate::session::{GuardState, Session, SessionUser};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "portfolio_session";

/// Session lifetime in seconds (7 days).
pub const SESSION_TTL_SECS: usize = 7 * 24 * 60 * 60;

/// Where unauthenticated browser navigations are sent.
pub const LOGIN_PATH: &str = "/admin";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity provider uid)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authorized admin, inserted into request extensions by [`require_admin`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

/// Session token from the cookie, or else from a bearer header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Verify a session token. Invalid or expired tokens give `None`.
pub fn verify_session_token(token: &str, signing_key: &[u8]) -> Option<SessionUser> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .ok()
        .map(|data| SessionUser {
            uid: data.claims.sub,
            email: data.claims.email,
        })
}

/// Build the session for a request from its cookie or bearer token.
pub async fn session_from_request(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> Session {
    let user = session_token(jar, headers)
        .and_then(|token| verify_session_token(&token, &state.config.jwt_signing_key));
    Session::resolve(user, &state.db).await
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// Middleware that admits only signed-in admins.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = session_from_request(&state, &jar, request.headers()).await;

    match session.guard_state() {
        GuardState::Authorized => {
            if let Some(user) = session.user {
                request.extensions_mut().insert(AuthUser {
                    uid: user.uid,
                    email: user.email,
                });
                return next.run(request).await;
            }
            AppError::Unauthorized.into_response()
        }
        GuardState::Unauthorized => AppError::NotAuthorized.into_response(),
        GuardState::Loading | GuardState::Unauthenticated => {
            if wants_html(request.headers()) {
                Redirect::to(LOGIN_PATH).into_response()
            } else {
                AppError::Unauthorized.into_response()
            }
        }
    }
}

/// Create a JWT for a user session.
pub fn create_jwt(uid: &str, email: Option<&str>, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: uid.to_string(),
        email: email.map(str::to_string),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
