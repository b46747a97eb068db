// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Project image handling and deletion.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::Project;
use crate::services::storage::StorageService;

/// Object path for a project image: `projects/{id}/{file}`.
pub fn image_path(project_id: &str, file_name: &str) -> Result<String, AppError> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::field("image", "Image file name is missing."));
    }
    Ok(format!("projects/{}/{}", project_id, name))
}

async fn require_project(db: &FirestoreDb, id: &str) -> Result<Project, AppError> {
    db.get_project(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("project {}", id)))
}

/// Remove the object behind an image URL. Failures are logged only.
async fn remove_image_best_effort(storage: &StorageService, project_id: &str, image_url: &str) {
    let Some(path) = storage.path_from_download_url(image_url) else {
        tracing::debug!(project_id, url = %image_url, "Image URL is not a bucket object");
        return;
    };
    if let Err(e) = storage.delete(&path).await {
        tracing::warn!(project_id, path = %path, error = %e, "Failed to delete project image");
    }
}

/// Upload a new image and store its download URL.
///
/// The previous object is removed only once the project points at the new
/// one, and only when the two paths differ. Removal is best effort.
pub async fn replace_image(
    db: &FirestoreDb,
    storage: &StorageService,
    project_id: &str,
    file_name: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<String, AppError> {
    if !content_type.starts_with("image/") {
        return Err(AppError::field("image", "Please select an image file."));
    }
    let path = image_path(project_id, file_name)?;
    let project = require_project(db, project_id).await?;

    storage.upload(&path, bytes, content_type).await?;
    let url = storage.download_url_for(&path).await?;
    db.set_project_image(project_id, Some(&url)).await?;
    tracing::info!(project_id, path = %path, "Project image uploaded");

    if let Some(old) = project.image_url.as_deref() {
        if storage.path_from_download_url(old).as_deref() != Some(path.as_str()) {
            remove_image_best_effort(storage, project_id, old).await;
        }
    }
    Ok(url)
}

/// Delete the image object (best effort) and clear the URL.
pub async fn clear_image(
    db: &FirestoreDb,
    storage: &StorageService,
    project_id: &str,
) -> Result<(), AppError> {
    let project = require_project(db, project_id).await?;
    if let Some(old) = project.image_url.as_deref() {
        remove_image_best_effort(storage, project_id, old).await;
    }
    db.set_project_image(project_id, None).await
}

/// Delete a project. Image removal never blocks the document delete.
pub async fn delete_project(
    db: &FirestoreDb,
    storage: &StorageService,
    project_id: &str,
) -> Result<(), AppError> {
    if let Some(project) = db.get_project(project_id).await? {
        if let Some(url) = project.image_url.as_deref() {
            remove_image_best_effort(storage, project_id, url).await;
        }
    }
    db.delete_project(project_id).await?;
    tracing::info!(project_id, "Project deleted");
    Ok(())
}
