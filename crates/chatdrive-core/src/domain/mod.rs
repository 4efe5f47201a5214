//! Domain entities and business logic
//!
//! This module contains the core domain types for ChatDrive:
//! - Newtypes for user identities, CSRF nonces, and folder identifiers
//! - Credential and CSRF state records
//! - Remote placement types (folder paths, upload results, media streams)
//! - The typed webhook event model
//! - Domain-specific error types

pub mod credential;
pub mod errors;
pub mod event;
pub mod folder;
pub mod newtypes;

// Re-export commonly used types
pub use credential::{ConnectionState, Credential, CsrfState};
pub use errors::{ConnectionError, DomainError, ProviderError};
pub use event::{ChatEvent, EventSource, MessageContent, WebhookPayload};
pub use folder::{ByteStream, FolderPath, MediaContent, RemoteFile, UploadResult};
pub use newtypes::*;
