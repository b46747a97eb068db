// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Portfolio project model for storage and API.

use crate::error::{AppError, FieldErrors};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Project document in the `projects` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Document key; read from the key, not from a stored field
    #[serde(rename(deserialize = "_firestore_id"))]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    /// Download URL of the image object (`projects/{id}/{file}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    /// Server-assigned creation time, stored as a Firestore timestamp
    #[serde(with = "firestore::serialize_as_timestamp")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

/// Technologies arrive either as a list or as the form's comma-separated text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Technologies {
    List(Vec<String>),
    Text(String),
}

impl Default for Technologies {
    fn default() -> Self {
        Technologies::List(Vec::new())
    }
}

impl Technologies {
    pub fn into_vec(self) -> Vec<String> {
        let items: Vec<String> = match self {
            Technologies::List(items) => items,
            Technologies::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Admin form input for creating or editing a project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Technologies,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub order: Option<i32>,
}

/// Editable project fields after trimming; written with an update mask so
/// `imageUrl` and `createdAt` are left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFields {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl ProjectFields {
    pub const FIELD_PATHS: [&'static str; 7] = [
        "title",
        "description",
        "technologies",
        "liveUrl",
        "githubUrl",
        "featured",
        "order",
    ];
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProjectInput {
    /// Trim, require title and description, split technologies.
    pub fn into_fields(self) -> Result<ProjectFields, AppError> {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();

        let mut errors = FieldErrors::new();
        if title.is_empty() {
            errors.insert("title".to_string(), "Title is required.".to_string());
        }
        if description.is_empty() {
            errors.insert(
                "description".to_string(),
                "Description is required.".to_string(),
            );
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(ProjectFields {
            title,
            description,
            technologies: self.technologies.into_vec(),
            live_url: non_blank(self.live_url),
            github_url: non_blank(self.github_url),
            featured: self.featured,
            order: self.order,
        })
    }
}

impl Project {
    /// Build a new project document from validated fields.
    pub fn new(id: String, fields: ProjectFields, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            technologies: fields.technologies,
            live_url: fields.live_url,
            github_url: fields.github_url,
            image_url: None,
            featured: fields.featured,
            order: fields.order,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_separated_technologies() {
        let input: ProjectInput = serde_json::from_str(
            r#"{"title":" Site ","description":"A site","technologies":"Rust, axum, ,Firestore"}"#,
        )
        .unwrap();
        let fields = input.into_fields().unwrap();
        assert_eq!(fields.title, "Site");
        assert_eq!(fields.technologies, vec!["Rust", "axum", "Firestore"]);
    }

    #[test]
    fn test_blank_urls_are_dropped() {
        let input = ProjectInput {
            title: "t".to_string(),
            description: "d".to_string(),
            live_url: Some("  ".to_string()),
            github_url: Some("https://github.com/x/y".to_string()),
            ..Default::default()
        };
        let fields = input.into_fields().unwrap();
        assert_eq!(fields.live_url, None);
        assert_eq!(fields.github_url.as_deref(), Some("https://github.com/x/y"));
    }

    #[test]
    fn test_stored_document_takes_id_from_key() {
        let legacy: Project = serde_json::from_value(serde_json::json!({
            "_firestore_id": "abc123",
            "title": "Old",
            "description": "d",
            "technologies": [],
            "createdAt": "2023-05-01T12:00:00Z",
        }))
        .unwrap();
        assert_eq!(legacy.id, "abc123");

        let written: Project = serde_json::from_value(serde_json::json!({
            "_firestore_id": "p1",
            "id": "p1",
            "title": "New",
            "description": "d",
            "createdAt": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(written.id, "p1");
        assert!(written.technologies.is_empty());

        let json = serde_json::to_value(&written).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_title_and_description_required() {
        let err = ProjectInput::default().into_fields().unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert!(fields.contains_key("title"));
                assert!(fields.contains_key("description"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
