// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin panel API. Every route here sits behind the admin guard.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    Certification, CertificationInput, Message, MessageStatus, MessageUpdate, Project,
    ProjectInput, ResumeMeta, SiteContent, SiteContentPatch,
};
use crate::routes::Notice;
use crate::services::{projects, resume};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Largest accepted upload (resume or project image).
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Admin routes, mounted under `/api/admin`.
/// The guard middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/content", get(get_content).put(save_content))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/{id}", put(update_project).delete(delete_project))
        .route(
            "/projects/{id}/image",
            post(upload_project_image).delete(remove_project_image),
        )
        .route(
            "/certifications",
            get(list_certifications).post(create_certification),
        )
        .route(
            "/certifications/{id}",
            put(update_certification).delete(delete_certification),
        )
        .route("/messages", get(list_messages))
        .route("/messages/{id}", get(open_message).delete(delete_message))
        .route("/messages/{id}/read", post(mark_read))
        .route("/messages/{id}/reply", post(reply_to_message))
        .route("/resume", post(upload_resume))
        .route("/resume/progress", get(resume_progress))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_messages: usize,
    pub new_messages: usize,
    pub projects: usize,
    pub certifications: usize,
    pub resume: Option<ResumeMeta>,
}

fn count_or_zero(what: &str, count: Result<usize>) -> usize {
    count.unwrap_or_else(|e| {
        tracing::warn!(what, error = %e, "Count failed, showing zero");
        0
    })
}

/// Totals for the dashboard. Failed counts show as zero.
async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<DashboardResponse> {
    tracing::debug!(uid = %user.uid, "Dashboard requested");
    let db = &state.db;

    let resume = db.get_resume_meta().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Resume lookup failed");
        None
    });

    Json(DashboardResponse {
        total_messages: count_or_zero("messages", db.count_messages().await),
        new_messages: count_or_zero(
            "new_messages",
            db.count_messages_by_status(MessageStatus::New).await,
        ),
        projects: count_or_zero("projects", db.count_projects().await),
        certifications: count_or_zero("certifications", db.count_certifications().await),
        resume,
    })
}

// ─── Site Content ────────────────────────────────────────────

async fn get_content(State(state): State<Arc<AppState>>) -> Result<Json<SiteContent>> {
    Ok(Json(state.db.get_site_content().await?))
}

async fn save_content(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SiteContentPatch>,
) -> Result<Json<Notice>> {
    let patch = patch.normalized();
    state.db.save_site_content(&patch).await?;
    Ok(Json(Notice::ok("Saved successfully!")))
}

// ─── Projects ────────────────────────────────────────────────

async fn list_projects(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Project>>> {
    Ok(Json(state.db.list_projects().await?))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Notice>)> {
    let fields = input.into_fields()?;
    let id = uuid::Uuid::new_v4().to_string();
    let project = Project::new(id.clone(), fields, Utc::now());
    state.db.add_project(&project).await?;

    tracing::info!(project_id = %id, "Project added");
    Ok((
        StatusCode::CREATED,
        Json(Notice::ok("Project added.").with_id(id)),
    ))
}

async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<ProjectInput>,
) -> Result<Json<Notice>> {
    let fields = input.into_fields()?;
    state.db.update_project(&id, &fields).await?;
    Ok(Json(Notice::ok("Project updated.")))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Notice>> {
    projects::delete_project(&state.db, &state.storage, &id).await?;
    Ok(Json(Notice::ok("Project deleted.")))
}

/// One file from a multipart form.
struct UploadedFile {
    file_name: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
}

/// First file part of a multipart body.
async fn read_file(mut multipart: Multipart) -> Result<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.file_name().is_none() {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(AppError::field("file", "Please select a file."))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub success: bool,
    pub message: String,
    pub image_url: String,
}

async fn upload_project_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ImageResponse>> {
    let file = read_file(multipart).await?;
    let file_name = file.file_name.unwrap_or_default();
    let image_url = projects::replace_image(
        &state.db,
        &state.storage,
        &id,
        &file_name,
        &file.content_type,
        file.bytes,
    )
    .await?;

    Ok(Json(ImageResponse {
        success: true,
        message: "Project updated.".to_string(),
        image_url,
    }))
}

async fn remove_project_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Notice>> {
    projects::clear_image(&state.db, &state.storage, &id).await?;
    Ok(Json(Notice::ok("Project updated.")))
}

// ─── Certifications ──────────────────────────────────────────

async fn list_certifications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Certification>>> {
    Ok(Json(state.db.list_certifications().await?))
}

async fn create_certification(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CertificationInput>,
) -> Result<(StatusCode, Json<Notice>)> {
    let id = uuid::Uuid::new_v4().to_string();
    let cert = input.into_certification(id.clone())?;
    state.db.add_certification(&cert).await?;
    Ok((
        StatusCode::CREATED,
        Json(Notice::ok("Certification added.").with_id(id)),
    ))
}

async fn update_certification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<CertificationInput>,
) -> Result<Json<Notice>> {
    let cert = input.into_certification(id)?;
    state.db.update_certification(&cert).await?;
    Ok(Json(Notice::ok("Certification updated.")))
}

async fn delete_certification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Notice>> {
    state.db.delete_certification(&id).await?;
    Ok(Json(Notice::ok("Certification deleted.")))
}

// ─── Messages ────────────────────────────────────────────────

async fn list_messages(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Message>>> {
    Ok(Json(state.db.list_messages().await?))
}

async fn require_message(state: &AppState, id: &str) -> Result<Message> {
    state
        .db
        .get_message(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("message {}", id)))
}

/// Move a message forward to `next`; never backwards.
async fn advance_status(state: &AppState, mut message: Message, next: MessageStatus) -> Result<Message> {
    let status = message.status.advance(next);
    if status != message.status {
        let update = MessageUpdate {
            status,
            reply_text: None,
            replied_at: None,
        };
        state.db.update_message(&message.id, &update).await?;
        message.status = status;
    }
    Ok(message)
}

/// Open a message; a `new` message becomes `read`.
async fn open_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Message>> {
    let message = require_message(&state, &id).await?;
    Ok(Json(advance_status(&state, message, MessageStatus::Read).await?))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Message>> {
    let message = require_message(&state, &id).await?;
    Ok(Json(advance_status(&state, message, MessageStatus::Read).await?))
}

#[derive(Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    reply: String,
}

/// Record a reply and mark the message `replied`.
async fn reply_to_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<Message>> {
    let reply = req.reply.trim();
    if reply.is_empty() {
        return Err(AppError::field("reply", "Reply cannot be empty."));
    }

    let mut message = require_message(&state, &id).await?;
    let update = MessageUpdate {
        status: MessageStatus::Replied,
        reply_text: Some(reply.to_string()),
        replied_at: Some(Utc::now()),
    };
    state.db.update_message(&id, &update).await?;

    message.status = update.status;
    message.reply_text = update.reply_text;
    message.replied_at = update.replied_at;
    Ok(Json(message))
}

async fn delete_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Notice>> {
    state.db.delete_message(&id).await?;
    Ok(Json(Notice::ok("Message deleted.")))
}

// ─── Resume ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ResumeUploadResponse {
    pub success: bool,
    pub message: String,
    pub resume: ResumeMeta,
}

async fn upload_resume(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<ResumeUploadResponse>> {
    let file = read_file(multipart).await?;
    let upload = resume::ResumeUpload {
        file_name: file
            .file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| state.config.resume_file_name.clone()),
        content_type: file.content_type,
        bytes: file.bytes,
    };

    let previous = state.db.get_resume_meta().await?;
    tracing::info!(uid = %user.uid, size = upload.bytes.len(), "Resume upload started");

    let meta = resume::replace_resume(
        &state.db,
        &state.storage,
        upload,
        previous,
        &state.resume_progress,
    )
    .await?;

    Ok(Json(ResumeUploadResponse {
        success: true,
        message: "CV uploaded and saved! The portfolio will now serve the new file.".to_string(),
        resume: meta,
    }))
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub percent: u8,
}

async fn resume_progress(State(state): State<Arc<AppState>>) -> Json<ProgressResponse> {
    Json(ProgressResponse {
        percent: *state.resume_progress.borrow(),
    })
}
