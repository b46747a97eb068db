// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables, so everything is read
//! once at startup and cached in memory.

use std::env;

/// Static resume served when no resume has been uploaded yet.
pub const FALLBACK_RESUME_PATH: &str = "/assets/cv.pdf";

/// Email API settings (service + template ids and the public key).
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub service_id: String,
    pub template_thank_you: String,
    pub template_admin: String,
    pub public_key: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL (CORS origin, redirect target)
    pub frontend_url: String,
    /// GCP / Firebase project ID
    pub gcp_project_id: String,
    /// Storage bucket holding resume and project images
    pub storage_bucket: String,
    /// Public web API key of the identity provider
    pub firebase_api_key: String,
    /// File name offered when downloading the resume
    pub resume_file_name: String,
    /// Server port
    pub port: u16,
    /// Notification email settings
    pub email: EmailConfig,
    /// Service-account key file used for storage access
    pub service_account_path: Option<String>,
    /// Keep storage objects in process memory when no key file is set
    pub allow_in_memory_storage: bool,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Deterministic offline config for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-project.firebasestorage.app".to_string(),
            firebase_api_key: "test_api_key".to_string(),
            resume_file_name: "cv.pdf".to_string(),
            port: 8080,
            email: EmailConfig {
                // Nothing listens on the discard port, so every send fails fast.
                api_url: "http://127.0.0.1:9".to_string(),
                service_id: "test_service".to_string(),
                template_thank_you: "template_thanks".to_string(),
                template_admin: "template_admin".to_string(),
                public_key: "test_public_key".to_string(),
            },
            service_account_path: None,
            allow_in_memory_storage: true,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());
        let storage_bucket = env::var("STORAGE_BUCKET")
            .unwrap_or_else(|_| format!("{}.firebasestorage.app", gcp_project_id));

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id,
            storage_bucket,
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            resume_file_name: env::var("RESUME_FILE_NAME").unwrap_or_else(|_| "cv.pdf".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            email: EmailConfig {
                api_url: env::var("EMAIL_API_URL")
                    .unwrap_or_else(|_| "https://api.emailjs.com".to_string()),
                service_id: env::var("EMAIL_SERVICE_ID").unwrap_or_default(),
                template_thank_you: env::var("EMAIL_TEMPLATE_THANKYOU").unwrap_or_default(),
                template_admin: env::var("EMAIL_TEMPLATE_ADMIN").unwrap_or_default(),
                public_key: env::var("EMAIL_PUBLIC_KEY").unwrap_or_default(),
            },
            service_account_path: env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
            allow_in_memory_storage: env::var("ALLOW_IN_MEMORY_STORAGE")
                .map(|v| matches!(v.trim(), "1" | "true"))
                .unwrap_or(false),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Where storage objects live.
    pub fn storage_mode(&self) -> Result<StorageMode<'_>, ConfigError> {
        match (&self.service_account_path, self.allow_in_memory_storage) {
            (Some(path), _) => Ok(StorageMode::ServiceAccount(path)),
            (None, true) => Ok(StorageMode::InMemory),
            (None, false) => Err(ConfigError::Missing("GOOGLE_APPLICATION_CREDENTIALS")),
        }
    }
}

/// Storage backend chosen at startup.
#[derive(Debug, PartialEq, Eq)]
pub enum StorageMode<'a> {
    /// Bucket access with the key file at this path
    ServiceAccount(&'a str),
    /// Objects vanish on restart; local development only
    InMemory,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("FIREBASE_API_KEY", " test_key ");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("GCP_PROJECT_ID", "my-portfolio");
        env::remove_var("STORAGE_BUCKET");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.firebase_api_key, "test_key");
        assert_eq!(config.storage_bucket, "my-portfolio.firebasestorage.app");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_storage_requires_credentials_or_opt_in() {
        let mut config = Config::test_default();
        assert_eq!(config.storage_mode().unwrap(), StorageMode::InMemory);

        config.allow_in_memory_storage = false;
        assert!(matches!(
            config.storage_mode(),
            Err(ConfigError::Missing("GOOGLE_APPLICATION_CREDENTIALS"))
        ));

        config.service_account_path = Some("/secrets/sa.json".to_string());
        assert_eq!(
            config.storage_mode().unwrap(),
            StorageMode::ServiceAccount("/secrets/sa.json")
        );
    }
}
