// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod certification;
pub mod content;
pub mod message;
pub mod project;

pub use certification::{Certification, CertificationInput};
pub use content::{
    AboutData, EducationEntry, ExperienceEntry, ResumeMeta, SiteContent, SiteContentPatch, Socials,
};
pub use message::{ContactForm, Message, MessageStatus, MessageUpdate};
pub use project::{Project, ProjectFields, ProjectInput};
