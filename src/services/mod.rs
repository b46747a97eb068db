// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod contact;
pub mod email;
pub mod identity;
pub mod projects;
pub mod resume;
pub mod storage;
pub mod token;

pub use email::EmailService;
pub use identity::{IdentityService, SignedInUser, StaticAccount};
pub use storage::{MetadataPatch, ObjectMetadata, StorageService};
pub use token::{IdTokenSource, ServiceAccountKey};
