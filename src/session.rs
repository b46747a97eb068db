// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session state and the admin route guard state machine.

use crate::db::FirestoreDb;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Signed-in identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionUser {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// What the client knows about the current visitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: Option<SessionUser>,
    pub is_admin: bool,
    pub loading: bool,
}

impl Session {
    /// Initial state, before identity and admin status are known.
    pub fn loading() -> Self {
        Self {
            user: None,
            is_admin: false,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: None,
            is_admin: false,
            loading: false,
        }
    }

    /// Settle the session for `user`: look up the admin record.
    ///
    /// A failed lookup counts as "not an admin".
    pub async fn resolve(user: Option<SessionUser>, db: &FirestoreDb) -> Self {
        let Some(user) = user else {
            return Self::signed_out();
        };

        let is_admin = match db.is_admin(&user.uid).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                tracing::warn!(uid = %user.uid, error = %e, "Admin check failed, denying access");
                false
            }
        };

        Self {
            user: Some(user),
            is_admin,
            loading: false,
        }
    }

    pub fn guard_state(&self) -> GuardState {
        GuardState::from_session(self)
    }
}

/// Protected-route decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Identity or admin status still unknown; nothing protected is shown.
    Loading,
    /// Send the visitor to the login entry point.
    Unauthenticated,
    /// Signed in without an admin record.
    Unauthorized,
    Authorized,
}

impl GuardState {
    pub fn from_session(session: &Session) -> Self {
        if session.loading {
            return GuardState::Loading;
        }
        match (&session.user, session.is_admin) {
            (None, _) => GuardState::Unauthenticated,
            (Some(_), false) => GuardState::Unauthorized,
            (Some(_), true) => GuardState::Authorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Option<SessionUser> {
        Some(SessionUser {
            uid: "uid-1".to_string(),
            email: Some("a@example.com".to_string()),
        })
    }

    #[test]
    fn test_loading_shows_nothing() {
        assert_eq!(Session::loading().guard_state(), GuardState::Loading);
        let mut session = Session::loading();
        session.user = user();
        session.is_admin = true;
        assert_eq!(session.guard_state(), GuardState::Loading);
    }

    #[tokio::test]
    async fn test_resolve_transitions() {
        let db = FirestoreDb::new_in_memory();
        assert_eq!(
            Session::resolve(None, &db).await.guard_state(),
            GuardState::Unauthenticated
        );
        assert_eq!(
            Session::resolve(user(), &db).await.guard_state(),
            GuardState::Unauthorized
        );

        db.grant_admin("uid-1").await.unwrap();
        assert_eq!(
            Session::resolve(user(), &db).await.guard_state(),
            GuardState::Authorized
        );
    }

    #[tokio::test]
    async fn test_failed_admin_check_is_unauthorized() {
        let db = FirestoreDb::new_mock();
        let session = Session::resolve(user(), &db).await;
        assert!(!session.is_admin);
        assert_eq!(session.guard_state(), GuardState::Unauthorized);
    }
}
