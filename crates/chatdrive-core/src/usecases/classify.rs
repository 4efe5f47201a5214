//! Failure classification
//!
//! Maps a [`ConnectionError`] to the recovery guidance shown to the user.
//! Classification selects a prompt; it never triggers a retry.

use crate::domain::{ConnectionError, ProviderError};

/// Which recovery prompt a failure calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The user never connected: show the connect prompt
    NoCredential,
    /// The provider rejected the credential: show the reconnect prompt
    AuthRejected,
    /// Anything else: show a generic failure
    Other,
}

/// Classifies operation failures
pub trait IFailureClassifier: Send + Sync {
    /// Returns the class of `err`
    fn classify(&self, err: &ConnectionError) -> FailureClass;
}

/// Classifier over the structured [`ProviderError`] surface
///
/// Free-text inspection is confined to [`ProviderError::Other`], the one
/// variant with no structure to inspect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderFailureClassifier;

impl ProviderFailureClassifier {
    fn classify_provider(err: &ProviderError) -> FailureClass {
        match err {
            ProviderError::Http {
                status: 401 | 403, ..
            }
            | ProviderError::InvalidGrant(_) => FailureClass::AuthRejected,
            ProviderError::Other(message) if message.contains("invalid_grant") => {
                FailureClass::AuthRejected
            }
            ProviderError::Http { .. }
            | ProviderError::Network(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::Other(_) => FailureClass::Other,
        }
    }
}

impl IFailureClassifier for ProviderFailureClassifier {
    fn classify(&self, err: &ConnectionError) -> FailureClass {
        match err {
            ConnectionError::NotFound => FailureClass::NoCredential,
            other => other
                .provider_error()
                .map_or(FailureClass::Other, Self::classify_provider),
        }
    }
}
