//! ChatDrive Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `Credential`, `CsrfState`, `FolderPath`, `ChatEvent`
//! - **Use cases** - `AuthorizationFlow`, `CredentialLifecycle`, `UploadOrchestrator`, `EventRouter`
//! - **Port definitions** - Traits for adapters: `ICredentialStore`, `IIdentityProvider`,
//!   `IStorageSessionFactory`, `IChatMessenger`
//! - **Configuration** - YAML file plus environment overrides
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain types through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
