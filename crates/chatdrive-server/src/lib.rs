//! ChatDrive server - webhook and OAuth callback endpoints
//!
//! - [`context`] - Builds the adapters and use cases from configuration
//! - [`http`] - hyper server with the webhook and callback routes
//! - [`sweeper`] - Background pruning of stale authorization states

pub mod context;
pub mod http;
pub mod sweeper;

pub use context::AppContext;
pub use http::WebServer;
