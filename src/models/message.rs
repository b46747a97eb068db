// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact messages and the public contact form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Message lifecycle. Moves forward only: new → read → replied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    New,
    Read,
    Replied,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::New => "new",
            MessageStatus::Read => "read",
            MessageStatus::Replied => "replied",
        }
    }

    /// Status after requesting `next`; never moves backwards.
    pub fn advance(self, next: MessageStatus) -> MessageStatus {
        self.max(next)
    }
}

/// Message document in the `messages` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Document key
    #[serde(rename(deserialize = "_firestore_id"))]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
    pub status: MessageStatus,
    #[serde(with = "firestore::serialize_as_timestamp")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_text: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "firestore::serialize_as_optional_timestamp"
    )]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub replied_at: Option<DateTime<Utc>>,
}

/// Status/reply fields written by the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdate {
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_text: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "firestore::serialize_as_optional_timestamp"
    )]
    pub replied_at: Option<DateTime<Utc>>,
}

impl MessageUpdate {
    /// Update mask: status alone, or status plus the reply fields.
    pub fn field_paths(&self) -> Vec<&'static str> {
        if self.reply_text.is_some() {
            vec!["status", "replyText", "repliedAt"]
        } else {
            vec!["status"]
        }
    }
}

/// Public contact form submission.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ContactForm {
    #[serde(default)]
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_email_pattern"))]
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    #[validate(length(min = 10, message = "Message must be at least 10 characters."))]
    pub message: String,
}

impl ContactForm {
    /// Trim every field; a blank subject becomes absent.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self
                .subject
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            message: self.message.trim().to_string(),
        }
    }

    /// Build the stored message (status `new`).
    pub fn into_message(self, id: String, created_at: DateTime<Utc>) -> Message {
        Message {
            id,
            name: self.name,
            email: self.email,
            subject: self.subject,
            message: self.message,
            status: MessageStatus::New,
            created_at,
            reply_text: None,
            replied_at: None,
        }
    }
}

/// `local@domain.tld`: one `@`, no whitespace, a dot inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

fn validate_email_pattern(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email) {
        return Ok(());
    }
    let mut err = ValidationError::new("email");
    err.message = Some("Please enter a valid email.".into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("jane example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane@@example.com"));
        assert!(!is_valid_email("jane@.com"));
        assert!(!is_valid_email("jane@example."));
    }

    #[test]
    fn test_status_never_reverts() {
        assert_eq!(MessageStatus::New.advance(MessageStatus::Read), MessageStatus::Read);
        assert_eq!(
            MessageStatus::Replied.advance(MessageStatus::Read),
            MessageStatus::Replied
        );
        assert_eq!(MessageStatus::Read.advance(MessageStatus::New), MessageStatus::Read);
    }

    #[test]
    fn test_contact_form_validation_after_trim() {
        let form = ContactForm {
            name: " J ".to_string(),
            email: "jane@example.com".to_string(),
            subject: Some("   ".to_string()),
            message: "  short  ".to_string(),
        }
        .normalized();

        assert!(form.subject.is_none());
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("message"));
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn test_valid_contact_form() {
        let form = ContactForm {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            subject: None,
            message: "Hello there, nice portfolio!".to_string(),
        }
        .normalized();
        assert!(form.validate().is_ok());

        let msg = form.into_message("m1".to_string(), Utc::now());
        assert_eq!(msg.status, MessageStatus::New);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["status"], serde_json::json!("new"));
        assert!(json.get("repliedAt").is_none());
    }

    #[test]
    fn test_legacy_message_document() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "_firestore_id": "k9",
            "name": "Sam",
            "email": "sam@example.com",
            "message": "Hello from the old site",
            "status": "replied",
            "createdAt": "2023-04-01T09:30:00.123+00:00",
            "replyText": "Thanks",
            "repliedAt": "2023-04-02T10:00:00+00:00",
        }))
        .unwrap();
        assert_eq!(msg.id, "k9");
        assert_eq!(msg.created_at.timestamp_millis(), 1_680_341_400_123);
        assert!(msg.replied_at.unwrap() > msg.created_at);
    }
}
