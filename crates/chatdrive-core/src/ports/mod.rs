//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICredentialStore`] / [`ICsrfStateStore`] - Persistent authorization state
//! - [`IIdentityProvider`] - OAuth consent URL, code exchange, revocation
//! - [`IStorageSessionFactory`] / [`IStorageSession`] - Remote storage operations
//! - [`IChatMessenger`] / [`IMessageContentSource`] - Chat platform replies and content

pub mod credential_store;
pub mod identity;
pub mod messenger;
pub mod storage;

pub use credential_store::{ICredentialStore, ICsrfStateStore};
pub use identity::IIdentityProvider;
pub use messenger::{IChatMessenger, IMessageContentSource, OutgoingMessage, QuickReply};
pub use storage::{IStorageSession, IStorageSessionFactory};
