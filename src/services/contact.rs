// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public contact form submission.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{ContactForm, Message};
use crate::services::email::EmailService;
use chrono::Utc;
use validator::Validate;

/// Validate, store as a `new` message, then send both notifications.
///
/// Success is decided by the database write alone.
pub async fn submit(
    db: &FirestoreDb,
    email: &EmailService,
    form: ContactForm,
) -> Result<Message, AppError> {
    let form = form.normalized();
    form.validate()?;

    let message = form.into_message(uuid::Uuid::new_v4().to_string(), Utc::now());
    db.add_message(&message).await?;
    tracing::info!(message_id = %message.id, "Contact message stored");

    email.notify_new_message(&message).await;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::MessageStatus;

    fn form(name: &str, email: &str, message: &str) -> ContactForm {
        ContactForm {
            name: name.to_string(),
            email: email.to_string(),
            subject: None,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_invalid_form_writes_nothing() {
        let db = FirestoreDb::new_in_memory();
        let email = EmailService::new(Config::test_default().email);

        let err = submit(&db, &email, form("J", "not-an-email", "short"))
            .await
            .unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields["email"], "Please enter a valid email.");
        assert_eq!(fields.len(), 3);
        assert_eq!(db.count_messages().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stored_even_when_email_fails() {
        let db = FirestoreDb::new_in_memory();
        let email = EmailService::new(Config::test_default().email);

        let message = submit(
            &db,
            &email,
            form("  Jane  ", "jane@example.com", "I would like to talk about a role."),
        )
        .await
        .unwrap();

        assert_eq!(message.name, "Jane");
        let stored = db.list_messages().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, MessageStatus::New);
    }
}
