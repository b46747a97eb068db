// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider client (email/password and custom-token sign-in).

use crate::error::AppError;
use crate::services::token::custom_token_uid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignedInUser {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: String,
    pub expires_in_secs: u64,
}

/// Account known to the static backend.
#[derive(Debug, Clone)]
pub struct StaticAccount {
    pub uid: String,
    pub email: String,
    pub password: String,
}

impl StaticAccount {
    pub fn new(uid: &str, email: &str, password: &str) -> Self {
        Self {
            uid: uid.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

#[derive(Clone)]
enum IdentityBackend {
    Remote {
        http: reqwest::Client,
        base_url: String,
        api_key: String,
    },
    Static {
        accounts: Arc<Vec<StaticAccount>>,
    },
}

/// Identity provider client.
#[derive(Clone)]
pub struct IdentityService {
    backend: IdentityBackend,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignIn<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomTokenSignIn<'a> {
    token: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    #[serde(default)]
    local_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    /// Seconds, as a decimal string
    #[serde(default)]
    expires_in: Option<String>,
}

impl IdentityService {
    /// Client for the hosted identity toolkit.
    ///
    /// For local development with the auth emulator, set FIREBASE_AUTH_EMULATOR_HOST.
    pub fn new(api_key: &str) -> Self {
        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using identity emulator");
                format!("http://{}/identitytoolkit.googleapis.com/v1", host)
            }
            Err(_) => IDENTITY_TOOLKIT_URL.to_string(),
        };
        Self::with_base_url(api_key, base_url)
    }

    pub fn with_base_url(api_key: &str, base_url: impl Into<String>) -> Self {
        Self {
            backend: IdentityBackend::Remote {
                http: reqwest::Client::new(),
                base_url: base_url.into(),
                api_key: api_key.to_string(),
            },
        }
    }

    /// Fixed set of accounts, no network.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_static(accounts: Vec<StaticAccount>) -> Self {
        Self {
            backend: IdentityBackend::Static {
                accounts: Arc::new(accounts),
            },
        }
    }

    /// Email/password sign-in.
    ///
    /// Every rejection is reported as [`AppError::InvalidCredentials`];
    /// transport failures as [`AppError::Identity`].
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignedInUser, AppError> {
        match &self.backend {
            IdentityBackend::Remote { .. } => {
                let body = PasswordSignIn {
                    email,
                    password,
                    return_secure_token: true,
                };
                self.sign_in_remote("accounts:signInWithPassword", &body)
                    .await
            }
            IdentityBackend::Static { accounts } => accounts
                .iter()
                .find(|a| a.email.eq_ignore_ascii_case(email.trim()) && a.password == password)
                .map(|a| static_user(&a.uid, Some(a.email.clone())))
                .ok_or(AppError::InvalidCredentials),
        }
    }

    /// Exchange a custom token for an ID token.
    pub async fn sign_in_with_custom_token(&self, token: &str) -> Result<SignedInUser, AppError> {
        match &self.backend {
            IdentityBackend::Remote { .. } => {
                let body = CustomTokenSignIn {
                    token,
                    return_secure_token: true,
                };
                self.sign_in_remote("accounts:signInWithCustomToken", &body)
                    .await
            }
            IdentityBackend::Static { .. } => custom_token_uid(token)
                .map(|uid| static_user(&uid, None))
                .ok_or(AppError::InvalidCredentials),
        }
    }

    async fn sign_in_remote<B: Serialize>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<SignedInUser, AppError> {
        let IdentityBackend::Remote {
            http,
            base_url,
            api_key,
        } = &self.backend
        else {
            return Err(AppError::Identity("not a remote backend".to_string()));
        };

        let url = format!("{}/{}", base_url, method);
        let response = http
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .timeout(HTTP_TIMEOUT)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Sign-in request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::info!(status = %status, body = %body, "Sign-in rejected");
            return Err(AppError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Identity(format!("HTTP {}: {}", status, body)));
        }

        let parsed: SignInResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("JSON parse error: {}", e)))?;

        let uid = match parsed.local_id {
            Some(uid) => uid,
            None => uid_from_id_token(&parsed.id_token)
                .ok_or_else(|| AppError::Identity("sign-in response without uid".to_string()))?,
        };

        Ok(SignedInUser {
            uid,
            email: parsed.email,
            expires_in_secs: parsed
                .expires_in
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
            id_token: parsed.id_token,
        })
    }
}

fn static_user(uid: &str, email: Option<String>) -> SignedInUser {
    SignedInUser {
        uid: uid.to_string(),
        email,
        id_token: format!("static-id-token-{uid}"),
        expires_in_secs: DEFAULT_TOKEN_LIFETIME_SECS,
    }
}

#[derive(Deserialize)]
struct IdTokenClaims {
    sub: String,
}

/// `sub` of a provider-issued ID token (signature not checked). The
/// custom-token exchange response carries no `localId`.
fn uid_from_id_token(id_token: &str) -> Option<String> {
    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<IdTokenClaims>(
        id_token,
        &jsonwebtoken::DecodingKey::from_secret(&[]),
        &validation,
    )
    .ok()
    .map(|data| data.claims.sub)
}
