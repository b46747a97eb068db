// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Admin records (presence grants admin rights)
//! - Site content singleton (merge writes)
//! - Projects, certifications and contact messages

use crate::db::{collections, MemoryStore, SITE_CONTENT_DOC};
use crate::error::AppError;
use crate::models::{
    Certification, Message, MessageStatus, MessageUpdate, Project, ProjectFields, ResumeMeta,
    SiteContent, SiteContentPatch,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Where documents live.
#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(MemoryStore),
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Option<Backend>,
}

/// Admin record: an empty document keyed by uid.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AdminRecord {}

/// `{ about: { resume: T } }`, written under a field mask.
#[derive(Serialize, Deserialize)]
struct ResumeWrite<T> {
    about: ResumeAbout<T>,
}

#[derive(Serialize, Deserialize)]
struct ResumeAbout<T> {
    resume: T,
}

impl<T> ResumeWrite<T> {
    fn new(resume: T) -> Self {
        Self {
            about: ResumeAbout { resume },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadUrlWrite {
    download_url: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectImageWrite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Some(Backend::Firestore(client)),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Some(Backend::Firestore(client)),
        })
    }

    /// Create a Firestore client authenticated with a service-account key file.
    pub async fn with_key_file(project_id: &str, key_path: &str) -> Result<Self, AppError> {
        let options = firestore::FirestoreDbOptions::new(project_id.to_string());
        let client =
            firestore::FirestoreDb::with_options_service_account_key_file(options, key_path.into())
                .await
                .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore (service account)");

        Ok(Self {
            backend: Some(Backend::Firestore(client)),
        })
    }

    /// Create a database backed by process memory (tests, local dev).
    pub fn new_in_memory() -> Self {
        Self {
            backend: Some(Backend::Memory(MemoryStore::new())),
        }
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { backend: None }
    }

    /// Helper to get the backend or return an error if offline.
    fn get_backend(&self) -> Result<&Backend, AppError> {
        self.backend
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Document Primitives ─────────────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_backend()? {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store
                .get(collection, id)
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| AppError::Database(format!("Malformed {collection}/{id}: {e}"))),
        }
    }

    /// Overwrite a whole document.
    async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + Sync + Send,
        for<'de> T: Deserialize<'de>,
    {
        match self.get_backend()? {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(id)
                    .object(doc)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => store.set(collection, id, to_json(doc)?),
        }
        Ok(())
    }

    /// Write only `field_paths`; everything else in the document keeps its value.
    async fn merge_doc<T>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
        field_paths: &[String],
    ) -> Result<(), AppError>
    where
        T: Serialize + Sync + Send,
        for<'de> T: Deserialize<'de>,
    {
        match self.get_backend()? {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .fields(field_paths.iter())
                    .in_col(collection)
                    .document_id(id)
                    .object(doc)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => store.merge(collection, id, &to_json(doc)?, field_paths),
        }
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match self.get_backend()? {
            Backend::Firestore(client) => {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(id)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => store.delete(collection, id),
        }
        Ok(())
    }

    /// All documents of a collection, ordered descending by one field.
    async fn list_desc<T>(&self, collection: &str, order_field: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_backend()? {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collection)
                .order_by([(order_field, firestore::FirestoreQueryDirection::Descending)])
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store
                .list_ordered(collection, order_field, true)
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<T>, _>>()
                .map_err(|e| AppError::Database(format!("Malformed {collection} document: {e}"))),
        }
    }

    /// Count documents, optionally with an equality filter.
    async fn count_docs<T>(
        &self,
        collection: &str,
        filter: Option<(&'static str, &str)>,
    ) -> Result<usize, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_backend()? {
            Backend::Firestore(client) => {
                let query = client.fluent().select().from(collection);
                let docs: Vec<T> = match filter {
                    Some((field, value)) => {
                        let value = value.to_string();
                        query
                            .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
                            .obj()
                            .query()
                            .await
                    }
                    None => query.obj().query().await,
                }
                .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(docs.len())
            }
            Backend::Memory(store) => Ok(store.count(collection, filter)),
        }
    }

    /// Read-then-write guard for partial updates of existing documents.
    async fn require_exists<T>(&self, collection: &str, id: &str) -> Result<T, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_doc(collection, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{collection}/{id}")))
    }

    // ─── Admin Operations ────────────────────────────────────────

    /// True when `admins/{uid}` exists.
    pub async fn is_admin(&self, uid: &str) -> Result<bool, AppError> {
        let record: Option<AdminRecord> = self.get_doc(collections::ADMINS, uid).await?;
        Ok(record.is_some())
    }

    /// Create an admin record (local seeding and tests).
    pub async fn grant_admin(&self, uid: &str) -> Result<(), AppError> {
        self.set_doc(collections::ADMINS, uid, &AdminRecord::default())
            .await
    }

    // ─── Site Content Operations ─────────────────────────────────

    /// Get the site content; a missing document yields defaults.
    pub async fn get_site_content(&self) -> Result<SiteContent, AppError> {
        Ok(self
            .get_doc(collections::SITE, SITE_CONTENT_DOC)
            .await?
            .unwrap_or_default())
    }

    /// Merge-save site content. Sections absent from the patch are unchanged.
    pub async fn save_site_content(&self, patch: &SiteContentPatch) -> Result<(), AppError> {
        let field_paths = patch.field_paths();
        if field_paths.is_empty() {
            return Ok(());
        }
        self.merge_doc(collections::SITE, SITE_CONTENT_DOC, patch, &field_paths)
            .await
    }

    /// Current resume metadata, if one was ever uploaded.
    pub async fn get_resume_meta(&self) -> Result<Option<ResumeMeta>, AppError> {
        Ok(self.get_site_content().await?.about.resume)
    }

    /// Replace `about.resume`, creating the content document if needed.
    pub async fn save_resume_meta(&self, meta: &ResumeMeta) -> Result<(), AppError> {
        let doc = ResumeWrite::new(meta.clone());
        self.merge_doc(
            collections::SITE,
            SITE_CONTENT_DOC,
            &doc,
            &["about.resume".to_string()],
        )
        .await
    }

    /// Store the public download URL next to the resume metadata.
    pub async fn set_resume_download_url(&self, url: &str) -> Result<(), AppError> {
        let doc = ResumeWrite::new(DownloadUrlWrite {
            download_url: url.to_string(),
        });
        self.merge_doc(
            collections::SITE,
            SITE_CONTENT_DOC,
            &doc,
            &["about.resume.downloadUrl".to_string()],
        )
        .await
    }

    // ─── Project Operations ──────────────────────────────────────

    /// Projects, newest first.
    pub async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        self.list_desc(collections::PROJECTS, "createdAt").await
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        self.get_doc(collections::PROJECTS, id).await
    }

    pub async fn add_project(&self, project: &Project) -> Result<(), AppError> {
        self.set_doc(collections::PROJECTS, &project.id, project)
            .await
    }

    /// Update the editable fields; `imageUrl` and `createdAt` are kept.
    pub async fn update_project(&self, id: &str, fields: &ProjectFields) -> Result<(), AppError> {
        let _: Project = self.require_exists(collections::PROJECTS, id).await?;
        let paths: Vec<String> = ProjectFields::FIELD_PATHS
            .iter()
            .map(|p| p.to_string())
            .collect();
        self.merge_doc(collections::PROJECTS, id, fields, &paths)
            .await
    }

    /// Set or clear the project's image URL.
    pub async fn set_project_image(
        &self,
        id: &str,
        image_url: Option<&str>,
    ) -> Result<(), AppError> {
        self.merge_doc(
            collections::PROJECTS,
            id,
            &ProjectImageWrite {
                image_url: image_url.map(str::to_string),
            },
            &["imageUrl".to_string()],
        )
        .await
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::PROJECTS, id).await
    }

    // ─── Certification Operations ────────────────────────────────

    /// Certifications ordered by date, most recent first.
    pub async fn list_certifications(&self) -> Result<Vec<Certification>, AppError> {
        self.list_desc(collections::CERTIFICATIONS, "date").await
    }

    pub async fn add_certification(&self, cert: &Certification) -> Result<(), AppError> {
        self.set_doc(collections::CERTIFICATIONS, &cert.id, cert)
            .await
    }

    pub async fn update_certification(&self, cert: &Certification) -> Result<(), AppError> {
        let _: Certification = self
            .require_exists(collections::CERTIFICATIONS, &cert.id)
            .await?;
        self.set_doc(collections::CERTIFICATIONS, &cert.id, cert)
            .await
    }

    pub async fn delete_certification(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::CERTIFICATIONS, id).await
    }

    // ─── Message Operations ──────────────────────────────────────

    /// Messages, newest first.
    pub async fn list_messages(&self) -> Result<Vec<Message>, AppError> {
        self.list_desc(collections::MESSAGES, "createdAt").await
    }

    pub async fn get_message(&self, id: &str) -> Result<Option<Message>, AppError> {
        self.get_doc(collections::MESSAGES, id).await
    }

    pub async fn add_message(&self, message: &Message) -> Result<(), AppError> {
        self.set_doc(collections::MESSAGES, &message.id, message)
            .await
    }

    /// Write status (and reply fields) of an existing message.
    pub async fn update_message(&self, id: &str, update: &MessageUpdate) -> Result<(), AppError> {
        let paths: Vec<String> = update
            .field_paths()
            .into_iter()
            .map(str::to_string)
            .collect();
        self.merge_doc(collections::MESSAGES, id, update, &paths)
            .await
    }

    pub async fn delete_message(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::MESSAGES, id).await
    }

    pub async fn count_messages_by_status(&self, status: MessageStatus) -> Result<usize, AppError> {
        self.count_docs::<Message>(collections::MESSAGES, Some(("status", status.as_str())))
            .await
    }

    // ─── Dashboard Counts ────────────────────────────────────────

    pub async fn count_messages(&self) -> Result<usize, AppError> {
        self.count_docs::<Message>(collections::MESSAGES, None)
            .await
    }

    pub async fn count_projects(&self) -> Result<usize, AppError> {
        self.count_docs::<Project>(collections::PROJECTS, None)
            .await
    }

    pub async fn count_certifications(&self) -> Result<usize, AppError> {
        self.count_docs::<Certification>(collections::CERTIFICATIONS, None)
            .await
    }
}

fn to_json<T: Serialize>(doc: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(doc)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize document: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AboutData, ExperienceEntry};

    fn resume(path: &str) -> ResumeMeta {
        ResumeMeta {
            storage_path: path.to_string(),
            file_name: "cv.pdf".to_string(),
            updated_at: chrono::Utc::now(),
            download_url: None,
        }
    }

    fn project(id: &str, created_at: &str) -> Project {
        let fields = crate::models::ProjectInput {
            title: id.to_string(),
            description: "d".to_string(),
            ..Default::default()
        }
        .into_fields()
        .unwrap();
        Project::new(id.to_string(), fields, created_at.parse().unwrap())
    }

    #[tokio::test]
    async fn test_missing_content_uses_defaults() {
        let db = FirestoreDb::new_in_memory();
        let content = db.get_site_content().await.unwrap();
        assert_eq!(content, SiteContent::default());
    }

    #[tokio::test]
    async fn test_skills_only_save_keeps_other_sections() {
        let db = FirestoreDb::new_in_memory();
        let about = AboutData {
            name: "Jane".to_string(),
            summary: "Engineer".to_string(),
            ..Default::default()
        };
        db.save_site_content(&SiteContentPatch {
            about: Some(about.clone()),
            experience: Some(vec![ExperienceEntry {
                company: "Acme".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        })
        .await
        .unwrap();

        db.save_site_content(&SiteContentPatch {
            skills: Some(vec!["Rust".to_string()]),
            ..Default::default()
        })
        .await
        .unwrap();

        let content = db.get_site_content().await.unwrap();
        assert_eq!(content.skills, vec!["Rust"]);
        assert_eq!(content.about, about);
        assert_eq!(content.experience[0].company, "Acme");
        assert!(content.education.is_empty());
    }

    #[tokio::test]
    async fn test_about_save_keeps_resume_meta() {
        let db = FirestoreDb::new_in_memory();
        db.save_resume_meta(&resume("cv/1-cv.pdf")).await.unwrap();

        db.save_site_content(&SiteContentPatch {
            about: Some(AboutData {
                name: "Jane".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        })
        .await
        .unwrap();

        let meta = db.get_resume_meta().await.unwrap().unwrap();
        assert_eq!(meta.storage_path, "cv/1-cv.pdf");
    }

    #[tokio::test]
    async fn test_download_url_merges_into_resume() {
        let db = FirestoreDb::new_in_memory();
        db.save_resume_meta(&resume("cv/1-cv.pdf")).await.unwrap();
        db.set_resume_download_url("https://example.com/cv")
            .await
            .unwrap();

        let meta = db.get_resume_meta().await.unwrap().unwrap();
        assert_eq!(meta.storage_path, "cv/1-cv.pdf");
        assert_eq!(meta.download_url.as_deref(), Some("https://example.com/cv"));
    }

    #[tokio::test]
    async fn test_round_trip_keeps_timestamps() {
        let db = FirestoreDb::new_in_memory();
        let meta = resume("cv/1-cv.pdf");
        db.save_resume_meta(&meta).await.unwrap();
        assert_eq!(db.get_resume_meta().await.unwrap(), Some(meta));

        let p = project("p1", "2024-02-03T04:05:06.789Z");
        db.add_project(&p).await.unwrap();
        assert_eq!(db.get_project("p1").await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn test_documents_without_stored_id_are_listed() {
        let db = FirestoreDb::new_in_memory();
        db.add_project(&project("newer", "2024-06-01T00:00:00Z"))
            .await
            .unwrap();
        if let Some(Backend::Memory(store)) = &db.backend {
            store.set(
                collections::PROJECTS,
                "abc123",
                serde_json::json!({
                    "title": "Old",
                    "description": "d",
                    "technologies": [],
                    "createdAt": "2023-01-01T00:00:00Z",
                }),
            );
        }

        let projects = db.list_projects().await.unwrap();
        let ids: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "abc123"]);
        assert_eq!(
            db.get_project("abc123").await.unwrap().unwrap().title,
            "Old"
        );
        assert_eq!(db.count_projects().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_set_and_clear_project_image() {
        let db = FirestoreDb::new_in_memory();
        db.add_project(&project("p1", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();

        db.set_project_image("p1", Some("https://img.example/a.png"))
            .await
            .unwrap();
        let stored = db.get_project("p1").await.unwrap().unwrap();
        assert_eq!(stored.image_url.as_deref(), Some("https://img.example/a.png"));

        db.set_project_image("p1", None).await.unwrap();
        let stored = db.get_project("p1").await.unwrap().unwrap();
        assert!(stored.image_url.is_none());
        assert_eq!(stored.title, "p1");
    }

    #[tokio::test]
    async fn test_admin_presence() {
        let db = FirestoreDb::new_in_memory();
        assert!(!db.is_admin("uid-1").await.unwrap());
        db.grant_admin("uid-1").await.unwrap();
        assert!(db.is_admin("uid-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_offline_mode_errors() {
        let db = FirestoreDb::new_mock();
        assert!(matches!(
            db.is_admin("uid").await,
            Err(AppError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_certification_is_not_found() {
        let db = FirestoreDb::new_in_memory();
        let cert = Certification {
            id: "nope".to_string(),
            name: "n".to_string(),
            issuer: "i".to_string(),
            date: "2024".to_string(),
            url: None,
        };
        assert!(db.update_certification(&cert).await.unwrap_err().is_not_found());
    }
}
