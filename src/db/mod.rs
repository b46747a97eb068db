// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, with an in-memory stand-in for tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

/// Collection names as constants.
pub mod collections {
    /// Presence of `admins/{uid}` grants admin rights
    pub const ADMINS: &str = "admins";
    /// Holds the `content` singleton
    pub const SITE: &str = "site";
    pub const PROJECTS: &str = "projects";
    pub const CERTIFICATIONS: &str = "certifications";
    pub const MESSAGES: &str = "messages";
}

/// Field carrying the document key on reads, as the Firestore client injects it.
pub const DOC_ID_FIELD: &str = "_firestore_id";

/// Document id of the site-content singleton inside [`collections::SITE`].
pub const SITE_CONTENT_DOC: &str = "content";
