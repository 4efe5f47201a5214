//! Use cases (interactors) for ChatDrive
//!
//! This module contains the application use cases that orchestrate
//! domain types and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`AuthorizationFlow`] - CSRF-safe begin/complete of the OAuth handshake
//! - [`CredentialLifecycle`] - Disconnect (revoke) and reconnect
//! - [`resolve_folder`] - Idempotent remote folder provisioning
//! - [`UploadOrchestrator`] - Media placement and recent-file queries
//! - [`ProviderFailureClassifier`] - Recovery guidance for failed operations
//! - [`EventRouter`] - Per-event command dispatch
//! - [`TransitionHooks`] - Side effects after a connection state change

pub mod authorize;
pub mod classify;
pub mod hooks;
pub mod lifecycle;
pub mod provision;
pub mod replies;
pub mod router;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

pub use authorize::AuthorizationFlow;
pub use classify::{FailureClass, IFailureClassifier, ProviderFailureClassifier};
pub use hooks::{IConnectionHook, TransitionHooks, UiStateSyncHook};
pub use lifecycle::CredentialLifecycle;
pub use provision::{find_folder_path, resolve_folder};
pub use replies::Command;
pub use router::EventRouter;
pub use upload::UploadOrchestrator;
