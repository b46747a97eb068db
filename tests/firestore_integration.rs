// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8081 cargo test --test firestore_integration
//!
//! Document ids are unique per run so tests can share one emulator.

use chrono::{DateTime, Utc};
use portfolio_api::models::{
    AboutData, ContactForm, MessageStatus, MessageUpdate, Project, ProjectInput, ResumeMeta,
    SiteContentPatch,
};

mod common;
use common::test_db;

/// Generate a unique id for test isolation.
fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

fn ts(value: &str) -> DateTime<Utc> {
    value.parse().unwrap()
}

fn project_fields(title: &str) -> portfolio_api::models::ProjectFields {
    ProjectInput {
        title: title.to_string(),
        description: "Integration test project".to_string(),
        technologies: portfolio_api::models::project::Technologies::Text("Rust, Firestore".into()),
        ..Default::default()
    }
    .into_fields()
    .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// ADMINS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_admin_record_lookup() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("uid");

    assert!(!db.is_admin(&uid).await.unwrap());
    db.grant_admin(&uid).await.unwrap();
    assert!(db.is_admin(&uid).await.unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════
// SITE CONTENT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_masked_content_writes() {
    require_emulator!();

    let db = test_db().await;
    let resume = ResumeMeta {
        storage_path: format!("cv/{}-cv.pdf", Utc::now().timestamp_millis()),
        file_name: "cv.pdf".to_string(),
        updated_at: ts("2024-01-01T00:00:00.000Z"),
        download_url: None,
    };
    db.save_resume_meta(&resume).await.unwrap();

    db.save_site_content(&SiteContentPatch {
        about: Some(AboutData {
            name: "Integration".to_string(),
            ..Default::default()
        }),
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
    assert_eq!(content.about.name, "Integration");
    assert_eq!(content.skills, vec!["Rust"]);
    assert_eq!(content.about.resume.as_ref(), Some(&resume));

    db.set_resume_download_url("https://files.example/cv.pdf")
        .await
        .unwrap();
    let stored = db.get_resume_meta().await.unwrap().unwrap();
    assert_eq!(stored.storage_path, resume.storage_path);
    assert_eq!(
        stored.download_url.as_deref(),
        Some("https://files.example/cv.pdf")
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// PROJECTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_project_lifecycle() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("project");

    let created_at = ts("2024-01-15T10:00:00.000Z");
    let project = Project::new(id.clone(), project_fields("Before"), created_at);
    db.add_project(&project).await.unwrap();
    db.set_project_image(&id, Some("https://img.example/a.png"))
        .await
        .unwrap();

    db.update_project(&id, &project_fields("After")).await.unwrap();

    let fetched = db.get_project(&id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "After");
    assert_eq!(fetched.technologies, vec!["Rust", "Firestore"]);
    // Masked update leaves image and creation time alone
    assert_eq!(fetched.image_url.as_deref(), Some("https://img.example/a.png"));
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.created_at, created_at);

    db.delete_project(&id).await.unwrap();
    assert!(db.get_project(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_missing_project_not_found() {
    require_emulator!();

    let db = test_db().await;
    let err = db
        .update_project(&unique_id("missing"), &project_fields("X"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ═══════════════════════════════════════════════════════════════════════════
// MESSAGES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_message_status_update() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("message");
    let message = ContactForm {
        name: "Emulator".to_string(),
        email: "emu@example.com".to_string(),
        subject: None,
        message: "Hello from the emulator".to_string(),
    }
    .into_message(id.clone(), ts("2024-01-15T10:00:00.000Z"));
    db.add_message(&message).await.unwrap();

    db.update_message(
        &id,
        &MessageUpdate {
            status: MessageStatus::Replied,
            reply_text: Some("Thanks!".to_string()),
            replied_at: Some(ts("2024-01-16T10:00:00.000Z")),
        },
    )
    .await
    .unwrap();

    let fetched = db.get_message(&id).await.unwrap().unwrap();
    assert_eq!(fetched.status, MessageStatus::Replied);
    assert_eq!(fetched.reply_text.as_deref(), Some("Thanks!"));
    assert_eq!(fetched.name, "Emulator");
    assert_eq!(fetched.replied_at, Some(ts("2024-01-16T10:00:00.000Z")));

    db.delete_message(&id).await.unwrap();
    assert!(db.get_message(&id).await.unwrap().is_none());
}
