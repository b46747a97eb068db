// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public portfolio routes (no authentication).

use crate::config::FALLBACK_RESUME_PATH;
use crate::error::Result;
use crate::models::{Certification, ContactForm, Project, SiteContent};
use crate::routes::Notice;
use crate::services::contact;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/content", get(get_content))
        .route("/api/projects", get(list_projects))
        .route("/api/certifications", get(list_certifications))
        .route("/api/resume", get(get_resume))
        .route("/api/contact", post(submit_contact))
}

async fn get_content(State(state): State<Arc<AppState>>) -> Result<Json<SiteContent>> {
    Ok(Json(state.db.get_site_content().await?))
}

async fn list_projects(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Project>>> {
    Ok(Json(state.db.list_projects().await?))
}

async fn list_certifications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Certification>>> {
    Ok(Json(state.db.list_certifications().await?))
}

/// Where the resume download button points.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ResumeLink {
    pub url: String,
    pub file_name: String,
    /// False when serving the bundled fallback file
    pub stored: bool,
}

/// Resolve the current resume, or the bundled fallback when none is stored.
async fn get_resume(State(state): State<Arc<AppState>>) -> Json<ResumeLink> {
    let fallback = || ResumeLink {
        url: FALLBACK_RESUME_PATH.to_string(),
        file_name: state.config.resume_file_name.clone(),
        stored: false,
    };

    let meta = match state.db.get_resume_meta().await {
        Ok(Some(meta)) => meta,
        Ok(None) => return Json(fallback()),
        Err(e) => {
            tracing::warn!(error = %e, "Resume lookup failed, serving fallback");
            return Json(fallback());
        }
    };

    let url = match meta.download_url {
        Some(url) => url,
        None => match state.storage.download_url_for(&meta.storage_path).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(path = %meta.storage_path, error = %e, "Resume URL unavailable, serving fallback");
                return Json(fallback());
            }
        },
    };

    Json(ResumeLink {
        url,
        file_name: meta.file_name,
        stored: true,
    })
}

async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<Notice>)> {
    contact::submit(&state.db, &state.email, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(Notice::ok(
            "Thanks for reaching out. I'll get back to you soon.",
        )),
    ))
}
