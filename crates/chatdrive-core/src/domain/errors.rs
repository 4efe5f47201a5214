//! Domain error types
//!
//! This module defines the error types shared across the core:
//! - [`DomainError`] for validation failures at construction time
//! - [`ProviderError`] for the typed error surface of remote providers
//! - [`ConnectionError`] for the outcomes of connection lifecycle and
//!   upload operations

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid user identity
    #[error("Invalid user identity: {0}")]
    InvalidIdentity(String),

    /// Invalid CSRF nonce
    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),

    /// Invalid remote folder identifier
    #[error("Invalid folder ID: {0}")]
    InvalidFolderId(String),

    /// Invalid folder name (empty, or contains characters the provider rejects)
    #[error("Invalid folder name: {0}")]
    InvalidFolderName(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Failure reported by a remote provider (identity provider or storage API)
///
/// Adapters map their transport errors into this enum so that the core can
/// classify failures structurally instead of inspecting message text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with a non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The token endpoint rejected the grant (expired, revoked, or reused)
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The response could not be parsed or was missing required fields
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Any other failure, carried as text
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Returns the HTTP status if the provider answered with one
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Outcome taxonomy of connection lifecycle and upload operations
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No credential (or no CSRF state) exists for the key
    #[error("Not found")]
    NotFound,

    /// The CSRF state was absent, expired, or already consumed
    #[error("Authorization state not found")]
    StateNotFound,

    /// The authorization code exchange was rejected
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(#[source] ProviderError),

    /// An authenticated storage session could not be established
    #[error("Session setup failed: {0}")]
    SessionFailed(#[source] ProviderError),

    /// Folder lookup or creation failed
    #[error("Folder provisioning failed: {0}")]
    ProvisionFailed(#[source] ProviderError),

    /// The file create or media transfer failed
    #[error("Upload failed: {0}")]
    UploadFailed(#[source] ProviderError),

    /// A read-only remote query failed
    #[error("Query failed: {0}")]
    QueryFailed(#[source] ProviderError),

    /// A local store operation failed
    #[error("Persistence failed: {0:#}")]
    Persistence(anyhow::Error),

    /// Local credential deletion failed after a revoke attempt
    #[error("Critical inconsistency: {0:#}")]
    CriticalInconsistency(anyhow::Error),
}

impl ConnectionError {
    /// Returns the provider error behind a remote failure, if any
    #[must_use]
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::ExchangeFailed(e)
            | Self::SessionFailed(e)
            | Self::ProvisionFailed(e)
            | Self::UploadFailed(e)
            | Self::QueryFailed(e) => Some(e),
            Self::NotFound
            | Self::StateNotFound
            | Self::Persistence(_)
            | Self::CriticalInconsistency(_) => None,
        }
    }
}
