//! Application context
//!
//! Wires the adapters into the use cases once at startup. Everything the
//! HTTP handlers and background tasks need is reachable from [`AppContext`],
//! which is shared behind an `Arc`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use chatdrive_core::config::{Config, StorageBackend};
use chatdrive_core::ports::{
    IChatMessenger, ICredentialStore, ICsrfStateStore, IIdentityProvider, IMessageContentSource,
};
use chatdrive_core::usecases::{
    AuthorizationFlow, CredentialLifecycle, EventRouter, ProviderFailureClassifier,
    TransitionHooks, UiStateSyncHook, UploadOrchestrator,
};
use chatdrive_drive::auth::{GoogleIdentityProvider, GoogleOAuthConfig};
use chatdrive_drive::provider::DriveSessionFactory;
use chatdrive_line::{LineClient, SignatureVerifier};
use chatdrive_store::{
    DatabasePool, MemoryCredentialStore, MemoryCsrfStateStore, SqliteCredentialStore,
    SqliteCsrfStateStore,
};

/// Shared state for request handlers and background tasks
pub struct AppContext {
    /// Effective configuration
    pub config: Config,
    /// Connect flow, used by the OAuth callback
    pub flow: Arc<AuthorizationFlow>,
    /// Disconnect and reconnect
    pub lifecycle: Arc<CredentialLifecycle>,
    /// Webhook event dispatch
    pub router: Arc<EventRouter>,
    /// Webhook signature check
    pub verifier: SignatureVerifier,
    /// Pending authorization states, pruned by the sweeper
    pub states: Arc<dyn ICsrfStateStore>,
    /// Open SQLite pool, when that backend is selected
    pool: Option<DatabasePool>,
}

impl AppContext {
    /// Builds the context from a configuration
    ///
    /// Opens the database for the SQLite backend and constructs every
    /// adapter. No remote call is made.
    pub async fn build(config: Config) -> Result<Self> {
        let (credentials, states, pool) = open_stores(&config).await?;

        let line = Arc::new(LineClient::from_config(&config.line));
        let messenger: Arc<dyn IChatMessenger> = line.clone();
        let content: Arc<dyn IMessageContentSource> = line;

        let google = Arc::new(
            GoogleIdentityProvider::new(&GoogleOAuthConfig::from(&config.google))
                .context("Invalid Google OAuth configuration")?,
        );
        let identity: Arc<dyn IIdentityProvider> = google.clone();
        let sessions = Arc::new(DriveSessionFactory::from_config(google, &config.drive));

        let hooks = TransitionHooks::new().with(Arc::new(UiStateSyncHook::new(
            Arc::clone(&messenger),
            config.ui.connected_menu_id.clone(),
            config.ui.disconnected_menu_id.clone(),
        )));

        let flow = Arc::new(
            AuthorizationFlow::new(
                Arc::clone(&identity),
                Arc::clone(&credentials),
                Arc::clone(&states),
                hooks.clone(),
            )
            .with_state_ttl(config.storage.state_ttl()),
        );

        let lifecycle = Arc::new(CredentialLifecycle::new(
            identity,
            Arc::clone(&credentials),
            Arc::clone(&flow),
            hooks.clone(),
        ));

        let uploads = Arc::new(
            UploadOrchestrator::new(credentials, sessions, config.drive.root_folder_name.clone())
                .with_utc_offset(config.drive.utc_offset())
                .with_recent_limit(config.drive.recent_files_limit),
        );

        let router = Arc::new(EventRouter::new(
            Arc::clone(&flow),
            Arc::clone(&lifecycle),
            uploads,
            messenger,
            content,
            Arc::new(ProviderFailureClassifier),
            hooks,
        ));

        let verifier = SignatureVerifier::new(&config.line.channel_secret);

        Ok(Self {
            config,
            flow,
            lifecycle,
            router,
            verifier,
            states,
            pool,
        })
    }

    /// Releases the database pool, if any
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

type Stores = (
    Arc<dyn ICredentialStore>,
    Arc<dyn ICsrfStateStore>,
    Option<DatabasePool>,
);

async fn open_stores(config: &Config) -> Result<Stores> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let path = &config.storage.database_path;
            let pool = DatabasePool::new(path)
                .await
                .with_context(|| format!("Failed to open database at {}", path.display()))?;
            info!(path = %path.display(), "Opened credential database");

            let credentials: Arc<dyn ICredentialStore> =
                Arc::new(SqliteCredentialStore::new(pool.pool().clone()));
            let states: Arc<dyn ICsrfStateStore> =
                Arc::new(SqliteCsrfStateStore::new(pool.pool().clone()));
            Ok((credentials, states, Some(pool)))
        }
        StorageBackend::Memory => {
            info!("Using in-memory stores; credentials are lost on restart");
            let credentials: Arc<dyn ICredentialStore> = Arc::new(MemoryCredentialStore::new());
            let states: Arc<dyn ICsrfStateStore> = Arc::new(MemoryCsrfStateStore::new());
            Ok((credentials, states, None))
        }
    }
}
