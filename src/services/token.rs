// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Service-account credentials and the tokens minted from them.
//!
//! Handles:
//! - Custom tokens (RS256) for the identity provider
//! - Cached ID tokens for storage requests
//! - OAuth2 access tokens via the JWT bearer grant (bucket administration)

use crate::error::AppError;
use crate::services::identity::IdentityService;
use anyhow::Context;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Audience required by the identity toolkit for custom tokens.
const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: u64 = 3600;
/// Refresh cached tokens this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Scope for bucket administration through the storage JSON API.
pub const STORAGE_FULL_CONTROL_SCOPE: &str =
    "https://www.googleapis.com/auth/devstorage.full_control";

/// The fields of a service-account key file this crate needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Read a key file as downloaded from the cloud console.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading service account {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("invalid service account file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let key: ServiceAccountKey =
            serde_json::from_str(raw).context("service account JSON did not parse")?;
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            anyhow::bail!("service account is missing client_email or private_key");
        }
        Ok(key)
    }

    fn encoding_key(&self) -> Result<EncodingKey, AppError> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid service account key: {}", e)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CustomTokenClaims {
    iss: String,
    sub: String,
    aud: String,
    iat: u64,
    exp: u64,
    uid: String,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Mint a custom token for `uid`, signed with the service-account key.
pub fn mint_custom_token(key: &ServiceAccountKey, uid: &str) -> Result<String, AppError> {
    let iat = unix_now();
    let claims = CustomTokenClaims {
        iss: key.client_email.clone(),
        sub: key.client_email.clone(),
        aud: CUSTOM_TOKEN_AUDIENCE.to_string(),
        iat,
        exp: iat + TOKEN_LIFETIME_SECS,
        uid: uid.to_string(),
    };

    encode(&Header::new(Algorithm::RS256), &claims, &key.encoding_key()?)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign custom token: {}", e)))
}

/// `uid` claim of a custom token, read without verifying the signature.
///
/// Only the static identity backend uses this.
pub(crate) fn custom_token_uid(token: &str) -> Option<String> {
    let mut validation = jsonwebtoken::Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<CustomTokenClaims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(&[]),
        &validation,
    )
    .ok()
    .map(|data| data.claims.uid)
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Exchange a signed assertion for an OAuth2 access token.
pub async fn fetch_access_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
    scope: &str,
) -> Result<String, AppError> {
    let iat = unix_now();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope,
        aud: &key.token_uri,
        iat,
        exp: iat + TOKEN_LIFETIME_SECS,
    };
    let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key.encoding_key()?)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign assertion: {}", e)))?;

    let response = http
        .post(&key.token_uri)
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await
        .map_err(|e| AppError::Identity(format!("Token request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Identity(format!("HTTP {}: {}", status, body)));
    }

    let token: AccessTokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::Identity(format!("JSON parse error: {}", e)))?;
    Ok(token.access_token)
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// ID tokens for a service principal, minted from the key and cached until
/// shortly before they expire.
pub struct IdTokenSource {
    key: ServiceAccountKey,
    uid: String,
    identity: IdentityService,
    cached: Mutex<Option<CachedToken>>,
}

impl IdTokenSource {
    pub fn new(key: ServiceAccountKey, uid: impl Into<String>, identity: IdentityService) -> Self {
        Self {
            key,
            uid: uid.into(),
            identity,
            cached: Mutex::new(None),
        }
    }

    /// Current ID token, exchanging a fresh custom token when needed.
    pub async fn id_token(&self) -> Result<String, AppError> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if Instant::now() < entry.expires_at {
                return Ok(entry.token.clone());
            }
        }

        let custom_token = mint_custom_token(&self.key, &self.uid)?;
        let user = self.identity.sign_in_with_custom_token(&custom_token).await?;
        let lifetime = Duration::from_secs(user.expires_in_secs).saturating_sub(EXPIRY_MARGIN);

        tracing::debug!(uid = %self.uid, "Obtained storage ID token");
        *cached = Some(CachedToken {
            token: user.id_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(user.id_token)
    }
}
