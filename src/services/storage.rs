// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object storage client (Firebase Storage REST, v0 API).
//!
//! Handles:
//! - Single-request and resumable uploads (with progress)
//! - Metadata reads and patches (content type, disposition, download token)
//! - Object deletion
//! - Download URLs and mapping them back to object paths

use crate::error::AppError;
use crate::services::token::IdTokenSource;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Public host that serves download URLs.
pub const FIREBASE_STORAGE_URL: &str = "https://firebasestorage.googleapis.com";

/// Resumable uploads send chunks in multiples of this size.
pub const CHUNK_GRANULARITY: usize = 256 * 1024;
const RESUMABLE_CHUNK_SIZE: usize = 4 * CHUNK_GRANULARITY;

/// Custom metadata key holding download tokens (comma-separated).
const DOWNLOAD_TOKENS_KEY: &str = "firebaseStorageDownloadTokens";

/// Object metadata as returned by the storage API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    /// Size in bytes, as a decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_tokens: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl ObjectMetadata {
    /// First download token, if the object has one.
    pub fn download_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()
            .or_else(|| {
                self.metadata
                    .as_ref()
                    .and_then(|m| m.get(DOWNLOAD_TOKENS_KEY))
                    .map(String::as_str)
            })
            .and_then(|tokens| tokens.split(',').map(str::trim).find(|t| !t.is_empty()))
    }
}

/// Fields to change on an object; `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct MetadataPatch {
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub download_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatchBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_disposition: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<HashMap<&'static str, &'a str>>,
}

#[derive(Clone)]
enum StorageBackend {
    Remote {
        http: reqwest::Client,
        base_url: String,
        auth: Arc<IdTokenSource>,
    },
    Memory {
        objects: Arc<DashMap<String, ObjectMetadata>>,
        /// Total bytes the bucket accepts
        quota: Option<u64>,
    },
}

/// Storage client bound to one bucket.
#[derive(Clone)]
pub struct StorageService {
    bucket: String,
    backend: StorageBackend,
}

impl StorageService {
    /// Create a client authenticating with service-principal ID tokens.
    ///
    /// For local development with the storage emulator, set FIREBASE_STORAGE_EMULATOR_HOST.
    pub fn new(bucket: &str, auth: IdTokenSource) -> Self {
        let base_url = match std::env::var("FIREBASE_STORAGE_EMULATOR_HOST") {
            Ok(host) => format!("http://{}", host),
            Err(_) => FIREBASE_STORAGE_URL.to_string(),
        };
        Self::with_base_url(bucket, base_url, auth)
    }

    pub fn with_base_url(bucket: &str, base_url: impl Into<String>, auth: IdTokenSource) -> Self {
        Self {
            bucket: bucket.to_string(),
            backend: StorageBackend::Remote {
                http: reqwest::Client::new(),
                base_url: base_url.into(),
                auth: Arc::new(auth),
            },
        }
    }

    /// Objects kept in process memory (tests, local dev).
    pub fn new_in_memory(bucket: &str) -> Self {
        Self::memory(bucket, None)
    }

    /// In-memory bucket that rejects uploads past `quota_bytes` in total.
    pub fn new_in_memory_with_quota(bucket: &str, quota_bytes: u64) -> Self {
        Self::memory(bucket, Some(quota_bytes))
    }

    fn memory(bucket: &str, quota: Option<u64>) -> Self {
        Self {
            bucket: bucket.to_string(),
            backend: StorageBackend::Memory {
                objects: Arc::new(DashMap::new()),
                quota,
            },
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload in one request.
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ObjectMetadata, AppError> {
        match &self.backend {
            StorageBackend::Remote { http, .. } => {
                let response = http
                    .post(self.objects_url())
                    .query(&[("name", path), ("uploadType", "media")])
                    .header(reqwest::header::AUTHORIZATION, self.auth_header().await?)
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(bytes)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;
                check_response_json(response, path).await
            }
            StorageBackend::Memory { objects, quota } => {
                self.store_in_memory(objects, *quota, path, bytes, content_type)
            }
        }
    }

    /// Upload with the resumable protocol, reporting 0-100 after each chunk.
    pub async fn upload_resumable(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<ObjectMetadata, AppError> {
        let total = bytes.len();
        let chunks = chunk_ranges(total);

        match &self.backend {
            StorageBackend::Remote { http, .. } => {
                let auth = self.auth_header().await?;
                let start = http
                    .post(self.objects_url())
                    .query(&[("name", path)])
                    .header(reqwest::header::AUTHORIZATION, &auth)
                    .header("X-Goog-Upload-Protocol", "resumable")
                    .header("X-Goog-Upload-Command", "start")
                    .header("X-Goog-Upload-Header-Content-Length", total.to_string())
                    .header("X-Goog-Upload-Header-Content-Type", content_type)
                    .json(&serde_json::json!({ "name": path, "contentType": content_type }))
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("Upload start failed: {}", e)))?;

                let start = check_response(start, path).await?;
                let upload_url = start
                    .headers()
                    .get("X-Goog-Upload-URL")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Storage("Upload start without session URL".to_string()))?;

                let last = chunks.len() - 1;
                for (i, (from, to)) in chunks.iter().copied().enumerate() {
                    let command = if i == last { "upload, finalize" } else { "upload" };
                    let response = http
                        .post(&upload_url)
                        .header(reqwest::header::AUTHORIZATION, &auth)
                        .header("X-Goog-Upload-Command", command)
                        .header("X-Goog-Upload-Offset", from.to_string())
                        .body(bytes[from..to].to_vec())
                        .send()
                        .await
                        .map_err(|e| AppError::Storage(format!("Chunk upload failed: {}", e)))?;

                    if i == last {
                        on_progress(percent(to, total));
                        return check_response_json(response, path).await;
                    }
                    check_response(response, path).await?;
                    on_progress(percent(to, total));
                }
                Err(AppError::Storage("Upload finished without finalize".to_string()))
            }
            StorageBackend::Memory { objects, quota } => {
                let meta = self.store_in_memory(objects, *quota, path, bytes, content_type)?;
                for (_, to) in &chunks {
                    on_progress(percent(*to, total));
                }
                Ok(meta)
            }
        }
    }

    /// Object metadata; a missing object is [`AppError::NotFound`].
    pub async fn get_metadata(&self, path: &str) -> Result<ObjectMetadata, AppError> {
        match &self.backend {
            StorageBackend::Remote { http, .. } => {
                let response = http
                    .get(self.object_url(path))
                    .header(reqwest::header::AUTHORIZATION, self.auth_header().await?)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("Metadata request failed: {}", e)))?;
                check_response_json(response, path).await
            }
            StorageBackend::Memory { objects, .. } => objects
                .get(path)
                .map(|o| o.value().clone())
                .ok_or_else(|| AppError::NotFound(path.to_string())),
        }
    }

    pub async fn patch_metadata(
        &self,
        path: &str,
        patch: &MetadataPatch,
    ) -> Result<ObjectMetadata, AppError> {
        match &self.backend {
            StorageBackend::Remote { http, .. } => {
                let body = PatchBody {
                    content_type: patch.content_type.as_deref(),
                    content_disposition: patch.content_disposition.as_deref(),
                    metadata: patch
                        .download_token
                        .as_deref()
                        .map(|t| HashMap::from([(DOWNLOAD_TOKENS_KEY, t)])),
                };
                let response = http
                    .patch(self.object_url(path))
                    .header(reqwest::header::AUTHORIZATION, self.auth_header().await?)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("Metadata patch failed: {}", e)))?;
                check_response_json(response, path).await
            }
            StorageBackend::Memory { objects, .. } => {
                let mut meta = objects
                    .get_mut(path)
                    .ok_or_else(|| AppError::NotFound(path.to_string()))?;
                if let Some(ct) = &patch.content_type {
                    meta.content_type = Some(ct.clone());
                }
                if let Some(cd) = &patch.content_disposition {
                    meta.content_disposition = Some(cd.clone());
                }
                if let Some(token) = &patch.download_token {
                    meta.download_tokens = Some(token.clone());
                }
                Ok(meta.value().clone())
            }
        }
    }

    /// Delete an object; a missing object is [`AppError::NotFound`].
    pub async fn delete(&self, path: &str) -> Result<(), AppError> {
        match &self.backend {
            StorageBackend::Remote { http, .. } => {
                let response = http
                    .delete(self.object_url(path))
                    .header(reqwest::header::AUTHORIZATION, self.auth_header().await?)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("Delete request failed: {}", e)))?;
                check_response(response, path).await?;
            }
            StorageBackend::Memory { objects, .. } => {
                objects
                    .remove(path)
                    .ok_or_else(|| AppError::NotFound(path.to_string()))?;
            }
        }
        tracing::debug!(path = %path, "Deleted storage object");
        Ok(())
    }

    /// Existing download token, or a freshly patched one.
    pub async fn ensure_download_token(&self, path: &str) -> Result<String, AppError> {
        let meta = self.get_metadata(path).await?;
        if let Some(token) = meta.download_token() {
            return Ok(token.to_string());
        }

        let token = uuid::Uuid::new_v4().to_string();
        self.patch_metadata(
            path,
            &MetadataPatch {
                download_token: Some(token.clone()),
                ..Default::default()
            },
        )
        .await?;
        Ok(token)
    }

    /// Public download URL of an existing object.
    pub async fn download_url_for(&self, path: &str) -> Result<String, AppError> {
        let token = self.ensure_download_token(path).await?;
        Ok(download_url(&self.bucket, path, &token))
    }

    /// Object path behind one of this bucket's download URLs.
    pub fn path_from_download_url(&self, url: &str) -> Option<String> {
        path_from_download_url(&self.bucket, url)
    }

    fn objects_url(&self) -> String {
        let base_url = match &self.backend {
            StorageBackend::Remote { base_url, .. } => base_url.as_str(),
            StorageBackend::Memory { .. } => FIREBASE_STORAGE_URL,
        };
        format!("{}/v0/b/{}/o", base_url, urlencoding::encode(&self.bucket))
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.objects_url(), urlencoding::encode(path))
    }

    async fn auth_header(&self) -> Result<String, AppError> {
        match &self.backend {
            StorageBackend::Remote { auth, .. } => Ok(format!("Firebase {}", auth.id_token().await?)),
            StorageBackend::Memory { .. } => Ok(String::new()),
        }
    }

    fn store_in_memory(
        &self,
        objects: &DashMap<String, ObjectMetadata>,
        quota: Option<u64>,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ObjectMetadata, AppError> {
        if let Some(quota) = quota {
            let used: u64 = objects
                .iter()
                .filter(|o| o.key() != path)
                .filter_map(|o| o.size.as_deref().and_then(|s| s.parse::<u64>().ok()))
                .sum();
            if used + bytes.len() as u64 > quota {
                return Err(AppError::Storage(format!(
                    "Bucket quota exceeded uploading {}",
                    path
                )));
            }
        }

        let meta = ObjectMetadata {
            name: path.to_string(),
            bucket: self.bucket.clone(),
            content_type: Some(content_type.to_string()),
            content_disposition: None,
            size: Some(bytes.len().to_string()),
            download_tokens: Some(uuid::Uuid::new_v4().to_string()),
            metadata: None,
        };
        objects.insert(path.to_string(), meta.clone());
        Ok(meta)
    }
}

/// `https://firebasestorage.googleapis.com/v0/b/{bucket}/o/{path}?alt=media&token={token}`
pub fn download_url(bucket: &str, path: &str, token: &str) -> String {
    format!(
        "{}/v0/b/{}/o/{}?alt=media&token={}",
        FIREBASE_STORAGE_URL,
        urlencoding::encode(bucket),
        urlencoding::encode(path),
        token
    )
}

/// Inverse of [`download_url`]. URLs for other hosts or buckets give `None`.
pub fn path_from_download_url(bucket: &str, url: &str) -> Option<String> {
    let prefix = format!(
        "{}/v0/b/{}/o/",
        FIREBASE_STORAGE_URL,
        urlencoding::encode(bucket)
    );
    let encoded = url.strip_prefix(&prefix)?;
    let encoded = encoded.split(['?', '#']).next()?;
    if encoded.is_empty() {
        return None;
    }
    urlencoding::decode(encoded).ok().map(|p| p.into_owned())
}

/// Byte ranges for resumable chunks. An empty body is still one (empty) chunk.
fn chunk_ranges(total: usize) -> Vec<(usize, usize)> {
    if total == 0 {
        return vec![(0, 0)];
    }
    (0..total)
        .step_by(RESUMABLE_CHUNK_SIZE)
        .map(|from| (from, (from + RESUMABLE_CHUNK_SIZE).min(total)))
        .collect()
}

fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as u64 * 100 + total as u64 / 2) / total as u64) as u8
}

/// Check response status and return error if not successful.
async fn check_response(
    response: reqwest::Response,
    path: &str,
) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(path.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Storage(format!("HTTP {}: {}", status, body)))
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    path: &str,
) -> Result<T, AppError> {
    check_response(response, path)
        .await?
        .json()
        .await
        .map_err(|e| AppError::Storage(format!("JSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const BUCKET: &str = "demo.firebasestorage.app";

    #[test]
    fn test_download_url_round_trips_to_path() {
        let url = download_url(BUCKET, "projects/p1/shot 1.png", "tok");
        assert_eq!(
            url,
            "https://firebasestorage.googleapis.com/v0/b/demo.firebasestorage.app/o/projects%2Fp1%2Fshot%201.png?alt=media&token=tok"
        );
        assert_eq!(
            path_from_download_url(BUCKET, &url).as_deref(),
            Some("projects/p1/shot 1.png")
        );
    }

    #[test]
    fn test_external_urls_have_no_path() {
        assert!(path_from_download_url(BUCKET, "https://imgur.com/a.png").is_none());
        let other = download_url("other-bucket", "a.png", "t");
        assert!(path_from_download_url(BUCKET, &other).is_none());
    }

    #[test]
    fn test_chunks_are_granular() {
        let ranges = chunk_ranges(RESUMABLE_CHUNK_SIZE * 2 + 10);
        assert_eq!(ranges.len(), 3);
        for (from, _) in &ranges {
            assert_eq!(from % CHUNK_GRANULARITY, 0);
        }
        assert_eq!(ranges.last().copied(), Some((2 * RESUMABLE_CHUNK_SIZE, 2 * RESUMABLE_CHUNK_SIZE + 10)));
        assert_eq!(chunk_ranges(0), vec![(0, 0)]);
    }

    #[test]
    fn test_download_token_prefers_first() {
        let meta = ObjectMetadata {
            download_tokens: Some("a,b".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.download_token(), Some("a"));

        let meta = ObjectMetadata {
            metadata: Some(HashMap::from([(DOWNLOAD_TOKENS_KEY.to_string(), "c".to_string())])),
            ..Default::default()
        };
        assert_eq!(meta.download_token(), Some("c"));
    }

    #[tokio::test]
    async fn test_memory_resumable_upload_reports_progress() {
        let storage = StorageService::new_in_memory(BUCKET);
        let seen = Mutex::new(Vec::new());
        let bytes = vec![0u8; RESUMABLE_CHUNK_SIZE + 1];

        storage
            .upload_resumable("cv/1-cv.pdf", bytes, "application/pdf", &|pct: u8| {
                seen.lock().unwrap().push(pct)
            })
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.last().copied(), Some(100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(storage.get_metadata("cv/1-cv.pdf").await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_quota_rejects_upload() {
        let storage = StorageService::new_in_memory_with_quota(BUCKET, 4);
        storage.upload("a", vec![0; 3], "image/png").await.unwrap();
        // Overwriting the same object only counts its new size
        storage.upload("a", vec![0; 4], "image/png").await.unwrap();

        let err = storage.upload("b", vec![0; 1], "image/png").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(storage.get_metadata("b").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_memory_delete_missing_is_not_found() {
        let storage = StorageService::new_in_memory(BUCKET);
        assert!(storage.delete("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_patch_keeps_token_and_sets_disposition() {
        let storage = StorageService::new_in_memory(BUCKET);
        let uploaded = storage
            .upload("cv/2-cv.pdf", b"%PDF".to_vec(), "application/pdf")
            .await
            .unwrap();
        let token = uploaded.download_token().unwrap().to_string();

        let patched = storage
            .patch_metadata(
                "cv/2-cv.pdf",
                &MetadataPatch {
                    content_disposition: Some("attachment; filename=\"cv.pdf\"".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.download_token(), Some(token.as_str()));
        assert_eq!(
            storage.download_url_for("cv/2-cv.pdf").await.unwrap(),
            download_url(BUCKET, "cv/2-cv.pdf", &token)
        );
    }
}
