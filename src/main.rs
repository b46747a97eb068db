// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Portfolio API Server
//!
//! Serves the public portfolio content and contact form, and the admin API
//! for managing content, messages and the resume.

use portfolio_api::{
    config::{Config, StorageMode},
    db::FirestoreDb,
    services::{EmailService, IdTokenSource, IdentityService, ServiceAccountKey, StorageService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Identity used for the server's own storage requests.
const STORAGE_PRINCIPAL_UID: &str = "portfolio-api";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Portfolio API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let identity = IdentityService::new(&config.firebase_api_key);

    // Storage needs a service account unless in-memory storage was asked for
    let storage = match config.storage_mode().expect("Storage is not configured") {
        StorageMode::ServiceAccount(path) => {
            let key = ServiceAccountKey::from_file(path).expect("Failed to load service account");
            tracing::info!(
                bucket = %config.storage_bucket,
                principal = %key.client_email,
                "Storage service initialized"
            );
            StorageService::new(
                &config.storage_bucket,
                IdTokenSource::new(key, STORAGE_PRINCIPAL_UID, identity.clone()),
            )
        }
        StorageMode::InMemory => {
            tracing::warn!("ALLOW_IN_MEMORY_STORAGE set, uploads are lost on restart");
            StorageService::new_in_memory(&config.storage_bucket)
        }
    };

    let email = EmailService::new(config.email.clone());

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        storage,
        identity,
        email,
    ));

    // Build router
    let app = portfolio_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portfolio_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
