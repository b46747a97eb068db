// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Portfolio API: backend for a personal portfolio site and its admin panel.
//!
//! This crate serves the public portfolio content and contact form, and the
//! admin API for editing content, reading messages and replacing the resume.
//! Documents live in Firestore, files in Firebase Storage.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod ops;
pub mod routes;
pub mod services;
pub mod session;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{EmailService, IdentityService, StorageService};
use tokio::sync::watch;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub storage: StorageService,
    pub identity: IdentityService,
    pub email: EmailService,
    /// Percentage of the resume upload in flight (0-100)
    pub resume_progress: watch::Sender<u8>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: FirestoreDb,
        storage: StorageService,
        identity: IdentityService,
        email: EmailService,
    ) -> Self {
        let (resume_progress, _) = watch::channel(0);
        Self {
            config,
            db,
            storage,
            identity,
            email,
            resume_progress,
        }
    }
}
