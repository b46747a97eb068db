// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification emails through the hosted email API.
//!
//! Two templates: a thank-you to the sender and a notification to the
//! site owner. Delivery is best effort.

use crate::config::EmailConfig;
use crate::error::AppError;
use crate::models::Message;
use serde::Serialize;
use std::time::Duration;

const SEND_PATH: &str = "/api/v1.0/email/send";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const NO_SUBJECT: &str = "(no subject)";

#[derive(Serialize)]
struct SendRequest<'a, P> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: P,
}

#[derive(Serialize)]
struct ThankYouParams<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct OwnerParams<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

/// Email API client.
#[derive(Clone)]
pub struct EmailService {
    http: reqwest::Client,
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Thank-you note to the person who wrote in.
    pub async fn send_thank_you(&self, name: &str, email: &str) -> Result<(), AppError> {
        self.send(
            &self.config.template_thank_you,
            ThankYouParams { name, email },
        )
        .await
    }

    /// New-message notification to the site owner.
    pub async fn send_owner_notification(&self, message: &Message) -> Result<(), AppError> {
        self.send(
            &self.config.template_admin,
            OwnerParams {
                name: &message.name,
                email: &message.email,
                subject: message.subject.as_deref().unwrap_or(NO_SUBJECT),
                message: &message.message,
            },
        )
        .await
    }

    /// Send both notifications concurrently. Outcomes are logged, never returned.
    pub async fn notify_new_message(&self, message: &Message) {
        let (thanks, owner) = tokio::join!(
            self.send_thank_you(&message.name, &message.email),
            self.send_owner_notification(message),
        );

        for (template, result) in [("thank_you", thanks), ("owner", owner)] {
            match result {
                Ok(()) => tracing::info!(message_id = %message.id, template, "Notification sent"),
                Err(e) => tracing::warn!(
                    message_id = %message.id,
                    template,
                    error = %e,
                    "Notification failed"
                ),
            }
        }
    }

    async fn send<P: Serialize>(&self, template_id: &str, params: P) -> Result<(), AppError> {
        let body = SendRequest {
            service_id: &self.config.service_id,
            template_id,
            user_id: &self.config.public_key,
            template_params: params,
        };

        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), SEND_PATH);
        let response = self
            .http
            .post(&url)
            .timeout(HTTP_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Email(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_owner_params_default_subject() {
        let params = OwnerParams {
            name: "Jane",
            email: "jane@example.com",
            subject: None::<&str>.unwrap_or(NO_SUBJECT),
            message: "hello",
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["subject"], "(no subject)");
    }

    #[tokio::test]
    async fn test_unreachable_api_is_email_error() {
        let service = EmailService::new(Config::test_default().email);
        let result = service.send_thank_you("Jane", "jane@example.com").await;
        assert!(matches!(result, Err(AppError::Email(_))));
    }
}
