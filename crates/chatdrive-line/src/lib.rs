//! ChatDrive LINE - LINE Messaging API adapter
//!
//! - [`client`] - Reply, rich menu linking, and message content download
//! - [`message`] - Rendering of outgoing messages into Messaging API JSON
//! - [`signature`] - `X-Line-Signature` verification for webhook requests

pub mod client;
pub mod message;
pub mod signature;

pub use client::LineClient;
pub use signature::SignatureVerifier;

use thiserror::Error;

/// Errors returned by the Messaging API adapter
#[derive(Debug, Error)]
pub enum LineError {
    /// The API answered with a non-success status
    #[error("LINE API returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A path parameter would produce an invalid URL
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl LineError {
    /// Builds the error for a non-success response, consuming its body
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Self::Api { status, message }
    }
}
