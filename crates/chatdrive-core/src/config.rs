//! Configuration module for ChatDrive.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! pattern for programmatic use.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for ChatDrive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub line: LineConfig,
    pub google: GoogleConfig,
    pub drive: DriveConfig,
    pub ui: UiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address for the webhook and OAuth callback endpoints.
    pub listen: String,
}

/// LINE Messaging API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Channel secret used to verify webhook signatures.
    pub channel_secret: String,
    /// Long-lived channel access token for the Messaging API.
    pub channel_access_token: String,
    /// Base URL for reply and rich menu calls.
    pub api_base_url: String,
    /// Base URL for message content downloads.
    pub data_api_base_url: String,
}

/// Google OAuth client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Public URL of this service's `/oauth/callback` endpoint.
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    /// OAuth scopes to request.
    pub scopes: Vec<String>,
}

/// Google Drive placement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL for metadata calls.
    pub api_base_url: String,
    /// Base URL for media uploads.
    pub upload_base_url: String,
    /// Name of the top-level folder that receives uploads.
    pub root_folder_name: String,
    /// Number of entries shown by `/recent_files`.
    pub recent_files_limit: u32,
    /// Offset from UTC, in minutes, used to pick the monthly folder.
    pub utc_offset_minutes: i32,
}

/// Rich menu identifiers, provisioned out-of-band.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Menu linked while the user has a credential.
    pub connected_menu_id: Option<String>,
    /// Menu linked while the user has no credential.
    pub disconnected_menu_id: Option<String>,
}

/// Which store implementation backs credentials and CSRF state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// SQLite database file.
    Sqlite,
    /// Process memory; everything is lost on restart.
    Memory,
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite database file (ignored by the memory backend).
    pub database_path: PathBuf,
    /// Age after which an unconsumed authorization state is rejected.
    pub state_ttl_minutes: u64,
    /// Minutes between sweeps of stale authorization states.
    pub sweep_interval_minutes: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/chatdrive/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("chatdrive")
            .join("config.yaml")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.server.listen = format!("0.0.0.0:{}", port.trim());
        }
        if let Some(v) = get("LINE_CHANNEL_SECRET") {
            self.line.channel_secret = v;
        }
        if let Some(v) = get("LINE_CHANNEL_ACCESS_TOKEN") {
            self.line.channel_access_token = v;
        }
        if let Some(v) = get("GOOGLE_CLIENT_ID") {
            self.google.client_id = v;
        }
        if let Some(v) = get("GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = v;
        }
        if let Some(v) = get("GOOGLE_REDIRECT_URL") {
            self.google.redirect_url = v;
        }
        if let Some(v) = get("CHATDRIVE_DATABASE") {
            self.storage.database_path = PathBuf::from(v);
        }
        if let Some(v) = get("CHATDRIVE_RICH_MENU_CONNECTED") {
            self.ui.connected_menu_id = Some(v);
        }
        if let Some(v) = get("CHATDRIVE_RICH_MENU_DISCONNECTED") {
            self.ui.disconnected_menu_id = Some(v);
        }
    }
}

impl DriveConfig {
    /// The configured offset, clamped to a valid range.
    pub fn utc_offset(&self) -> FixedOffset {
        let seconds = self
            .utc_offset_minutes
            .clamp(-MAX_OFFSET_MINUTES, MAX_OFFSET_MINUTES)
            * 60;
        FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
    }
}

impl StorageConfig {
    /// Maximum age of an authorization state, capped at one week.
    pub fn state_ttl(&self) -> chrono::Duration {
        let minutes = i64::try_from(self.state_ttl_minutes.min(MAX_STATE_TTL_MINUTES))
            .unwrap_or(DEFAULT_STATE_TTL_MINUTES as i64);
        chrono::Duration::try_minutes(minutes)
            .unwrap_or_else(|| chrono::Duration::minutes(DEFAULT_STATE_TTL_MINUTES as i64))
    }

    /// Time between stale-state sweeps, between one minute and one day.
    pub fn sweep_interval(&self) -> std::time::Duration {
        let minutes = self
            .sweep_interval_minutes
            .clamp(1, MAX_SWEEP_INTERVAL_MINUTES);
        let seconds = minutes
            .checked_mul(60)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_MINUTES * 60);
        std::time::Duration::from_secs(seconds)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Largest real-world UTC offset, in minutes (UTC+14).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

const DEFAULT_STATE_TTL_MINUTES: u64 = 15;
const DEFAULT_SWEEP_INTERVAL_MINUTES: u64 = 5;

/// Longest accepted authorization state lifetime (one week).
const MAX_STATE_TTL_MINUTES: u64 = 7 * 24 * 60;

/// Longest accepted pause between sweeps (one day).
const MAX_SWEEP_INTERVAL_MINUTES: u64 = 24 * 60;

/// Default scope: only files created by this app are visible to it.
const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: String::new(),
            channel_access_token: String::new(),
            api_base_url: "https://api.line.me".to_string(),
            data_api_base_url: "https://api-data.line.me".to_string(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: "http://localhost:5000/oauth/callback".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            scopes: vec![DRIVE_FILE_SCOPE.to_string()],
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            root_folder_name: "LINE Bot Uploads".to_string(),
            recent_files_limit: 5,
            utc_offset_minutes: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("chatdrive");
        Self {
            backend: StorageBackend::Sqlite,
            database_path: data_dir.join("chatdrive.db"),
            state_ttl_minutes: DEFAULT_STATE_TTL_MINUTES,
            sweep_interval_minutes: DEFAULT_SWEEP_INTERVAL_MINUTES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"google.client_id"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

/// Carousel size limit of the chat platform.
const MAX_RECENT_FILES: u32 = 12;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        // --- server ---
        if self.server.listen.parse::<SocketAddr>().is_err() {
            push(
                "server.listen",
                format!("not a socket address: {}", self.server.listen),
            );
        }

        // --- line ---
        if self.line.channel_secret.is_empty() {
            push("line.channel_secret", "must be set".into());
        }
        if self.line.channel_access_token.is_empty() {
            push("line.channel_access_token", "must be set".into());
        }
        for (field, value) in [
            ("line.api_base_url", &self.line.api_base_url),
            ("line.data_api_base_url", &self.line.data_api_base_url),
        ] {
            if let Some(message) = check_url(value) {
                push(field, message);
            }
        }

        // --- google ---
        if self.google.client_id.is_empty() {
            push("google.client_id", "must be set".into());
        }
        if self.google.client_secret.is_empty() {
            push("google.client_secret", "must be set".into());
        }
        for (field, value) in [
            ("google.redirect_url", &self.google.redirect_url),
            ("google.auth_url", &self.google.auth_url),
            ("google.token_url", &self.google.token_url),
            ("google.revoke_url", &self.google.revoke_url),
        ] {
            if let Some(message) = check_url(value) {
                push(field, message);
            }
        }
        if self.google.scopes.is_empty() {
            push("google.scopes", "at least one scope is required".into());
        }

        // --- drive ---
        for (field, value) in [
            ("drive.api_base_url", &self.drive.api_base_url),
            ("drive.upload_base_url", &self.drive.upload_base_url),
        ] {
            if let Some(message) = check_url(value) {
                push(field, message);
            }
        }
        if self.drive.root_folder_name.trim().is_empty() {
            push("drive.root_folder_name", "must not be blank".into());
        }
        if self.drive.recent_files_limit == 0 || self.drive.recent_files_limit > MAX_RECENT_FILES {
            push(
                "drive.recent_files_limit",
                format!("must be between 1 and {MAX_RECENT_FILES}"),
            );
        }
        if self.drive.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            push(
                "drive.utc_offset_minutes",
                format!("must be within ±{MAX_OFFSET_MINUTES}"),
            );
        }

        // --- ui ---
        for (field, value) in [
            ("ui.connected_menu_id", &self.ui.connected_menu_id),
            ("ui.disconnected_menu_id", &self.ui.disconnected_menu_id),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                push(field, "must not be blank when set".into());
            }
        }

        // --- storage ---
        if self.storage.backend == StorageBackend::Sqlite
            && self.storage.database_path.as_os_str().is_empty()
        {
            push("storage.database_path", "must be set for the sqlite backend".into());
        }
        if !(1..=MAX_STATE_TTL_MINUTES).contains(&self.storage.state_ttl_minutes) {
            push(
                "storage.state_ttl_minutes",
                format!("must be between 1 and {MAX_STATE_TTL_MINUTES}"),
            );
        }
        if !(1..=MAX_SWEEP_INTERVAL_MINUTES).contains(&self.storage.sweep_interval_minutes) {
            push(
                "storage.sweep_interval_minutes",
                format!("must be between 1 and {MAX_SWEEP_INTERVAL_MINUTES}"),
            );
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            push(
                "logging.format",
                format!(
                    "invalid format '{}'; expected one of: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            );
        }

        errors
    }
}

/// Returns a message if `value` is not an absolute http(s) URL.
fn check_url(value: &str) -> Option<String> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => None,
        Ok(url) => Some(format!("unsupported scheme '{}'", url.scheme())),
        Err(e) => Some(format!("invalid URL '{value}': {e}")),
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- server ---

    pub fn listen(mut self, addr: impl Into<String>) -> Self {
        self.config.server.listen = addr.into();
        self
    }

    // --- line ---

    pub fn line_channel_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.line.channel_secret = secret.into();
        self
    }

    pub fn line_channel_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.line.channel_access_token = token.into();
        self
    }

    pub fn line_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.line.api_base_url = url.into();
        self
    }

    pub fn line_data_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.line.data_api_base_url = url.into();
        self
    }

    // --- google ---

    pub fn google_client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.config.google.client_id = id.into();
        self.config.google.client_secret = secret.into();
        self
    }

    pub fn google_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.config.google.redirect_url = url.into();
        self
    }

    pub fn google_token_url(mut self, url: impl Into<String>) -> Self {
        self.config.google.token_url = url.into();
        self
    }

    pub fn google_revoke_url(mut self, url: impl Into<String>) -> Self {
        self.config.google.revoke_url = url.into();
        self
    }

    // --- drive ---

    pub fn drive_base_urls(mut self, api: impl Into<String>, upload: impl Into<String>) -> Self {
        self.config.drive.api_base_url = api.into();
        self.config.drive.upload_base_url = upload.into();
        self
    }

    pub fn drive_root_folder_name(mut self, name: impl Into<String>) -> Self {
        self.config.drive.root_folder_name = name.into();
        self
    }

    pub fn drive_recent_files_limit(mut self, n: u32) -> Self {
        self.config.drive.recent_files_limit = n;
        self
    }

    pub fn drive_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.config.drive.utc_offset_minutes = minutes;
        self
    }

    // --- ui ---

    pub fn ui_menus(mut self, connected: impl Into<String>, disconnected: impl Into<String>) -> Self {
        self.config.ui.connected_menu_id = Some(connected.into());
        self.config.ui.disconnected_menu_id = Some(disconnected.into());
        self
    }

    // --- storage ---

    pub fn storage_backend(mut self, backend: StorageBackend) -> Self {
        self.config.storage.backend = backend;
        self
    }

    pub fn storage_database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    pub fn storage_sweep_interval_minutes(mut self, minutes: u64) -> Self {
        self.config.storage.sweep_interval_minutes = minutes;
        self
    }

    pub fn storage_state_ttl_minutes(mut self, minutes: u64) -> Self {
        self.config.storage.state_ttl_minutes = minutes;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
