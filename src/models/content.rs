// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Site content singleton (`site/content`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Singleton document holding the public portfolio text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SiteContent {
    #[serde(default)]
    pub about: AboutData,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(default, rename_all = "camelCase")]
pub struct AboutData {
    pub name: String,
    pub title: String,
    pub summary: String,
    pub location: String,
    pub email: String,
    pub socials: Socials,
    /// Legacy static resume link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    /// Managed by the resume upload flow only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(default)]
pub struct Socials {
    pub github: String,
    pub linkedin: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(default)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    pub start: String,
    pub end: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(default)]
pub struct EducationEntry {
    pub school: String,
    pub degree: String,
    pub start: String,
    pub end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Current resume object, stored at `site/content.about.resume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ResumeMeta {
    /// Object path, e.g. `cv/1718000000000-cv.pdf`. Never reused.
    pub storage_path: String,
    pub file_name: String,
    /// Write time, stored as a Firestore timestamp
    #[serde(with = "firestore::serialize_as_timestamp")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
    /// Public URL, set by the metadata patch utility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Partial site-content write. Only present sections are written; the rest of
/// the stored document keeps its prior values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SiteContentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<AboutData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<ExperienceEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Vec<EducationEntry>>,
}

/// `about` fields an admin may edit; `about.resume` belongs to the upload flow.
const ABOUT_EDITABLE_FIELDS: [&str; 7] = [
    "name",
    "title",
    "summary",
    "location",
    "email",
    "socials",
    "resumeUrl",
];

impl SiteContentPatch {
    /// Document field paths this patch writes (the update mask).
    pub fn field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        if self.about.is_some() {
            paths.extend(ABOUT_EDITABLE_FIELDS.iter().map(|f| format!("about.{f}")));
        }
        if self.skills.is_some() {
            paths.push("skills".to_string());
        }
        if self.experience.is_some() {
            paths.push("experience".to_string());
        }
        if self.education.is_some() {
            paths.push("education".to_string());
        }
        paths
    }

    /// Trim skills, drop blanks and duplicates (first occurrence wins).
    pub fn normalized(mut self) -> Self {
        if let Some(skills) = self.skills.take() {
            let mut seen = std::collections::HashSet::new();
            let skills = skills
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
                .collect();
            self.skills = Some(skills);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skills_only_patch_masks_skills() {
        let patch = SiteContentPatch {
            skills: Some(vec!["Rust".to_string()]),
            ..Default::default()
        };
        assert_eq!(patch.field_paths(), vec!["skills".to_string()]);
    }

    #[test]
    fn test_about_patch_never_touches_resume() {
        let patch = SiteContentPatch {
            about: Some(AboutData::default()),
            ..Default::default()
        };
        let paths = patch.field_paths();
        assert!(paths.contains(&"about.summary".to_string()));
        assert!(!paths.iter().any(|p| p.starts_with("about.resume.") || p == "about.resume"));
    }

    #[test]
    fn test_skills_are_deduplicated() {
        let patch = SiteContentPatch {
            skills: Some(vec![
                " Rust ".to_string(),
                "Go".to_string(),
                "rust".to_string(),
                "".to_string(),
            ]),
            ..Default::default()
        }
        .normalized();
        assert_eq!(patch.skills.unwrap(), vec!["Rust", "Go"]);
    }

    #[test]
    fn test_missing_sections_deserialize_to_defaults() {
        let content: SiteContent =
            serde_json::from_str(r#"{"skills":["Rust"],"about":{"name":"Jane"}}"#).unwrap();
        assert_eq!(content.about.name, "Jane");
        assert!(content.experience.is_empty());
        assert!(content.about.resume.is_none());
    }
}
