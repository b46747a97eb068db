// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Certification model.

use crate::error::{AppError, FieldErrors};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Certification document in the `certifications` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Certification {
    /// Document key
    #[serde(rename(deserialize = "_firestore_id"))]
    pub id: String,
    pub name: String,
    pub issuer: String,
    /// Free-form date; listings sort on it descending
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Admin form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificationInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl CertificationInput {
    /// Trim and validate into a document with the given id.
    pub fn into_certification(self, id: String) -> Result<Certification, AppError> {
        let name = self.name.trim().to_string();
        let issuer = self.issuer.trim().to_string();
        let date = self.date.trim().to_string();

        let mut errors = FieldErrors::new();
        for (field, value) in [("name", &name), ("issuer", &issuer), ("date", &date)] {
            if value.is_empty() {
                errors.insert(field.to_string(), format!("{} is required.", capitalize(field)));
            }
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(Certification {
            id,
            name,
            issuer,
            date,
            url: self
                .url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
