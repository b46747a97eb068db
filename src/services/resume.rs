// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resume replacement: upload a new object, point the metadata at it,
//! then remove the old object.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::ResumeMeta;
use crate::services::storage::StorageService;
use chrono::Utc;
use tokio::sync::watch;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
const RESUME_PREFIX: &str = "cv/";
const RESUME_SUFFIX: &str = "-cv.pdf";

/// File received from the admin panel.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Millisecond stamp of a `cv/{millis}-cv.pdf` path.
pub fn resume_stamp(path: &str) -> Option<i64> {
    path.strip_prefix(RESUME_PREFIX)?
        .strip_suffix(RESUME_SUFFIX)?
        .parse()
        .ok()
}

/// Path for a new upload, strictly newer than `previous`.
pub fn next_resume_path(now_millis: i64, previous: Option<&str>) -> String {
    let stamp = match previous.and_then(resume_stamp) {
        Some(prev) if prev >= now_millis => prev.saturating_add(1),
        _ => now_millis,
    };
    format!("{RESUME_PREFIX}{stamp}{RESUME_SUFFIX}")
}

/// Replace the current resume.
///
/// Upload failure leaves the previous object and metadata untouched.
/// Metadata failure removes the new object again (best effort) and returns
/// the error. Deleting the previous object is best effort.
pub async fn replace_resume(
    db: &FirestoreDb,
    storage: &StorageService,
    upload: ResumeUpload,
    previous: Option<ResumeMeta>,
    progress: &watch::Sender<u8>,
) -> Result<ResumeMeta, AppError> {
    if upload.content_type != PDF_CONTENT_TYPE {
        return Err(AppError::field("file", "Only PDF files are accepted."));
    }

    let now = Utc::now();
    let storage_path = next_resume_path(
        now.timestamp_millis(),
        previous.as_ref().map(|p| p.storage_path.as_str()),
    );

    progress.send_replace(0);
    let publish = |pct: u8| {
        progress.send_replace(pct);
    };

    storage
        .upload_resumable(&storage_path, upload.bytes, PDF_CONTENT_TYPE, &publish)
        .await
        .inspect_err(|e| tracing::error!(path = %storage_path, error = %e, "Resume upload failed"))?;

    let meta = ResumeMeta {
        storage_path: storage_path.clone(),
        file_name: upload.file_name,
        updated_at: now,
        download_url: None,
    };

    if let Err(e) = db.save_resume_meta(&meta).await {
        tracing::error!(path = %storage_path, error = %e, "Resume metadata save failed");
        if let Err(cleanup) = storage.delete(&storage_path).await {
            tracing::warn!(path = %storage_path, error = %cleanup, "Failed to remove orphaned resume");
        }
        return Err(e);
    }

    if let Some(old) = previous.filter(|p| p.storage_path != storage_path) {
        if let Err(e) = storage.delete(&old.storage_path).await {
            tracing::warn!(path = %old.storage_path, error = %e, "Failed to delete previous resume");
        }
    }

    tracing::info!(path = %storage_path, "Resume replaced");
    Ok(meta)
}
