// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Operator pipelines behind the `portfolio-ops` binary.
//!
//! Each pipeline runs its steps one after another and stops at the first
//! failure; nothing is retried.

use crate::db::FirestoreDb;
use crate::models::ResumeMeta;
use crate::services::resume::{next_resume_path, PDF_CONTENT_TYPE};
use crate::services::storage::{download_url, MetadataPatch, StorageService};
use crate::services::token::{fetch_access_token, ServiceAccountKey, STORAGE_FULL_CONTROL_SCOPE};
use anyhow::{bail, Context};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;

const STORAGE_JSON_API: &str = "https://storage.googleapis.com/storage/v1";

/// `attachment; filename="…"` so browsers download instead of displaying.
pub fn attachment_disposition(file_name: &str) -> String {
    format!("attachment; filename=\"{}\"", file_name.replace('"', ""))
}

/// Upload a local PDF as the new resume and point `about.resume` at it.
pub async fn upload_resume(
    db: &FirestoreDb,
    storage: &StorageService,
    pdf_path: &Path,
    file_name: &str,
) -> anyhow::Result<ResumeMeta> {
    let bytes = tokio::fs::read(pdf_path)
        .await
        .with_context(|| format!("CV not found: {}", pdf_path.display()))?;
    tracing::info!(kb = bytes.len() / 1024, "Read CV");

    let previous = db
        .get_resume_meta()
        .await
        .context("failed reading current resume metadata")?;
    let now = Utc::now();
    let storage_path = next_resume_path(
        now.timestamp_millis(),
        previous.as_ref().map(|p| p.storage_path.as_str()),
    );

    tracing::info!(bucket = %storage.bucket(), path = %storage_path, "Uploading");
    let uploaded = storage
        .upload(&storage_path, bytes, PDF_CONTENT_TYPE)
        .await
        .context("upload failed")?;

    let fresh_token = uuid::Uuid::new_v4().to_string();
    let patch = MetadataPatch {
        download_token: Some(fresh_token.clone()),
        ..Default::default()
    };
    let token = match storage.patch_metadata(&storage_path, &patch).await {
        Ok(_) => fresh_token,
        Err(e) => {
            tracing::warn!(error = %e, "Download token patch failed, keeping upload token");
            uploaded
                .download_token()
                .map(str::to_string)
                .unwrap_or(fresh_token)
        }
    };
    tracing::info!(
        url = %download_url(storage.bucket(), &storage_path, &token),
        "Download token set"
    );

    let meta = ResumeMeta {
        storage_path,
        file_name: file_name.to_string(),
        updated_at: now,
        download_url: None,
    };
    db.save_resume_meta(&meta)
        .await
        .context("failed writing resume metadata")?;

    tracing::info!(path = %meta.storage_path, file_name = %meta.file_name, "Firestore updated");
    Ok(meta)
}

/// Mark the current resume as a download and store its public URL.
pub async fn patch_resume_meta(
    db: &FirestoreDb,
    storage: &StorageService,
    file_name: &str,
) -> anyhow::Result<String> {
    let Some(resume) = db
        .get_resume_meta()
        .await
        .context("failed reading resume metadata")?
    else {
        bail!("No resume found in Firestore. Run upload-resume first.");
    };
    let path = resume.storage_path;
    tracing::info!(path = %path, "Patching resume object");

    let existing_token = match storage.get_metadata(&path).await {
        Ok(meta) => meta.download_token().map(str::to_string),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read current metadata");
            None
        }
    };

    let patch = MetadataPatch {
        content_type: Some(PDF_CONTENT_TYPE.to_string()),
        content_disposition: Some(attachment_disposition(file_name)),
        download_token: existing_token.clone(),
    };
    let patched = storage
        .patch_metadata(&path, &patch)
        .await
        .context("PATCH failed")?;

    let token = existing_token
        .or_else(|| patched.download_token().map(str::to_string))
        .context("object has no download token")?;
    let url = download_url(storage.bucket(), &path, &token);

    db.set_resume_download_url(&url)
        .await
        .context("failed writing download URL")?;
    tracing::info!(url = %url, "Download URL saved");
    Ok(url)
}

/// One bucket CORS rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsRule {
    pub origin: Vec<String>,
    pub method: Vec<String>,
    pub max_age_seconds: u32,
    pub response_header: Vec<String>,
}

impl CorsRule {
    /// Rule allowing browser uploads and downloads from `origins`.
    pub fn for_origins(origins: Vec<String>) -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            origin: origins,
            method: strings(&["GET", "HEAD", "PUT", "POST", "DELETE", "OPTIONS"]),
            max_age_seconds: 3600,
            response_header: strings(&[
                "Content-Type",
                "Authorization",
                "Content-Length",
                "User-Agent",
                "x-goog-resumable",
                "x-goog-meta-firebaseStorageDownloadTokens",
            ]),
        }
    }
}

/// Default origins: local dev servers plus the hosted site.
pub fn default_cors_origins(project_id: &str) -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
        "http://localhost:5175".to_string(),
        format!("https://{project_id}.web.app"),
        format!("https://{project_id}.firebaseapp.com"),
    ]
}

#[derive(Serialize)]
struct BucketCorsPatch<'a> {
    cors: &'a [CorsRule],
}

/// Replace the bucket's CORS policy.
pub async fn set_cors(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
    bucket: &str,
    rules: &[CorsRule],
) -> anyhow::Result<()> {
    let access_token = fetch_access_token(http, key, STORAGE_FULL_CONTROL_SCOPE)
        .await
        .context("failed obtaining access token")?;

    let url = format!("{}/b/{}", STORAGE_JSON_API, urlencoding::encode(bucket));
    let response = http
        .patch(&url)
        .query(&[("fields", "cors")])
        .bearer_auth(access_token)
        .json(&BucketCorsPatch { cors: rules })
        .send()
        .await
        .context("CORS request failed")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 => tracing::error!("Not authenticated; check the service account"),
            403 => tracing::error!("Service account lacks Storage Admin permission"),
            _ => {}
        }
        bail!("HTTP {}: {}", status, body);
    }

    tracing::info!(bucket, origins = ?rules.iter().flat_map(|r| &r.origin).collect::<Vec<_>>(), "CORS applied");
    Ok(())
}
