//! Configuration.
//!
//! A [`Config`] is built once at startup, from an optional TOML file
//! overlaid with environment variables, and handed to the constructors of
//! the source, the blob store and the engine.
//!
//! ```toml
//! measure_id = "2067-level-stage-i-15_min-mASD"
//! log_level = "info"
//!
//! [storage]
//! container = "hereford"
//! # endpoint = "https://storage.example.com"  # omit for a local directory
//!
//! [sync]
//! search_limit_days = 7
//! bootstrap_from = "2024-01-01"
//! poll_interval = 900
//! ```
//!
//! | Variable | Field |
//! |----------|-------|
//! | `MEASURE_ID` | `measure_id` |
//! | `BUCKET` | `storage.container` |
//! | `LOG_LEVEL` | `log_level` |
//! | `FLOODLOG_DATA_DIR` | `storage.root` |
//! | `FLOODLOG_STORE_ENDPOINT` | `storage.endpoint` |
//! | `FLOODLOG_STORE_TOKEN` | `storage.token` |
//! | `FLOODLOG_API_BASE` | `api.base_url` |
//! | `FLOODLOG_BOOTSTRAP_FROM` | `sync.bootstrap_from` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;

use floodlog_store::{
    Blobstore, DEFAULT_SEARCH_LIMIT_DAYS, FsBlobstore, HttpBlobstore, default_data_dir,
};

use crate::engine::SyncOptions;
use crate::error::Result;
use crate::source::{DEFAULT_API_BASE, FloodApiSource};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Configuration for one archived measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Measure identifier on the flood-monitoring API.
    pub measure_id: String,
    /// Log verbosity (`trace`, `debug`, `info`, `warn`, `error`).
    pub log_level: String,
    /// API settings.
    pub api: ApiConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Sync settings.
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            measure_id: String::new(),
            log_level: "info".to_string(),
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load_default() -> std::result::Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> std::result::Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Overlay values from an environment lookup function.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value: &String| !value.is_empty());

        if let Some(measure_id) = var("MEASURE_ID") {
            self.measure_id = measure_id;
        }
        if let Some(container) = var("BUCKET") {
            self.storage.container = container;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(root) = var("FLOODLOG_DATA_DIR") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(endpoint) = var("FLOODLOG_STORE_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(token) = var("FLOODLOG_STORE_TOKEN") {
            self.storage.token = Some(token);
        }
        if let Some(base_url) = var("FLOODLOG_API_BASE") {
            self.api.base_url = base_url;
        }
        if let Some(date) = var("FLOODLOG_BOOTSTRAP_FROM") {
            let parsed = Date::parse(&date, format_description!("[year]-[month]-[day]"))
                .map_err(|e| ConfigError::InvalidEnv {
                    var: "FLOODLOG_BOOTSTRAP_FROM".to_string(),
                    message: e.to_string(),
                })?;
            self.sync.bootstrap_from = Some(parsed);
        }

        Ok(())
    }

    /// Load the file at `path` (or the default file), overlay the
    /// environment and validate the result.
    pub fn resolve(path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::load_default()?,
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - The measure id and storage container are set and are plain names
    /// - The API base URL and storage endpoint use http(s)
    /// - The search limit is between 1 and 366 days
    /// - The poll interval is between 1 minute and 1 day
    /// - The log level is a known level
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.measure_id.is_empty() {
            errors.push(ValidationError::new("measure_id", "measure id is required"));
        } else if self.measure_id.contains('/') {
            errors.push(ValidationError::new(
                "measure_id",
                format!("invalid measure id '{}': must not contain '/'", self.measure_id),
            ));
        }

        if level_directive(&self.log_level).is_none() {
            errors.push(ValidationError::new(
                "log_level",
                format!(
                    "unknown log level '{}': expected trace, debug, info, warn or error",
                    self.log_level
                ),
            ));
        }

        errors.extend(self.api.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.sync.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// `tracing` filter directive for the configured log level.
    pub fn log_filter(&self) -> &'static str {
        level_directive(&self.log_level).unwrap_or("info")
    }

    /// Engine options from the sync settings.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            search_limit_days: self.sync.search_limit_days,
            bootstrap_from: self.sync.bootstrap_from,
        }
    }

    /// Build the readings source for the configured measure.
    pub fn readings_source(&self) -> Result<FloodApiSource> {
        FloodApiSource::new(&self.api.base_url, &self.measure_id)
    }

    /// Open the configured blob store.
    pub fn open_blobstore(&self) -> Result<Box<dyn Blobstore>> {
        let blobs: Box<dyn Blobstore> = match &self.storage.endpoint {
            Some(endpoint) => {
                let mut store = HttpBlobstore::new(endpoint, &self.storage.container)?;
                if let Some(token) = &self.storage.token {
                    store = store.with_token(token.clone());
                }
                Box::new(store)
            }
            None => Box::new(FsBlobstore::new(self.storage.local_dir())),
        };
        Ok(blobs)
    }
}

/// Map a log level name to a `tracing` directive.
///
/// Accepts the usual names case-insensitively, including `warning` and
/// `critical` as used by other logging setups.
fn level_directive(level: &str) -> Option<&'static str> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" => Some("error"),
        _ => None,
    }
}

/// API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root URL of the flood-monitoring API.
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl ApiConfig {
    /// Validate API settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !is_http_url(&self.base_url) {
            errors.push(ValidationError::new(
                "api.base_url",
                format!(
                    "invalid URL '{}': must start with http:// or https://",
                    self.base_url
                ),
            ));
        }
        errors
    }
}

/// Storage settings.
///
/// Without an `endpoint` dayfiles are written to `root/container` on the
/// local filesystem; with one they go to the `container` bucket of that
/// HTTP object store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Container (bucket) holding the dayfiles.
    pub container: String,
    /// Parent directory for local containers.
    pub root: PathBuf,
    /// Object store endpoint. Local storage when absent.
    pub endpoint: Option<String>,
    /// Bearer token for the object store.
    pub token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            container: String::new(),
            root: default_data_dir(),
            endpoint: None,
            token: None,
        }
    }
}

impl StorageConfig {
    /// Directory holding the dayfiles when storing locally.
    pub fn local_dir(&self) -> PathBuf {
        self.root.join(&self.container)
    }

    /// Validate storage settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.container.is_empty() {
            errors.push(ValidationError::new(
                "storage.container",
                "storage container is required",
            ));
        } else if self.container.contains(['/', '\\']) || self.container.starts_with('.') {
            errors.push(ValidationError::new(
                "storage.container",
                format!("invalid container '{}': must be a plain name", self.container),
            ));
        }

        if let Some(endpoint) = &self.endpoint {
            if !is_http_url(endpoint) {
                errors.push(ValidationError::new(
                    "storage.endpoint",
                    format!(
                        "invalid URL '{}': must start with http:// or https://",
                        endpoint
                    ),
                ));
            }
        } else if self.root.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.root",
                "data directory cannot be empty",
            ));
        }

        errors
    }
}

/// Minimum poll interval in seconds (1 minute).
pub const MIN_POLL_INTERVAL: u64 = 60;
/// Maximum poll interval in seconds (1 day).
pub const MAX_POLL_INTERVAL: u64 = 86_400;

/// Sync settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Days to search back for the most recent dayfile.
    pub search_limit_days: u32,
    /// First day to fetch when bootstrapping an empty archive.
    #[serde(with = "iso_date::option")]
    pub bootstrap_from: Option<Date>,
    /// Seconds between cycles in scheduled mode.
    pub poll_interval: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            search_limit_days: DEFAULT_SEARCH_LIMIT_DAYS,
            bootstrap_from: None,
            poll_interval: 900,
        }
    }
}

impl SyncConfig {
    /// Validate sync settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(1..=366).contains(&self.search_limit_days) {
            errors.push(ValidationError::new(
                "sync.search_limit_days",
                format!(
                    "search limit {} is out of range (1-366 days)",
                    self.search_limit_days
                ),
            ));
        }

        if !(MIN_POLL_INTERVAL..=MAX_POLL_INTERVAL).contains(&self.poll_interval) {
            errors.push(ValidationError::new(
                "sync.poll_interval",
                format!(
                    "poll interval {}s is out of range ({}-{}s)",
                    self.poll_interval, MIN_POLL_INTERVAL, MAX_POLL_INTERVAL
                ),
            ));
        }

        errors
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid value in {var}: {message}")]
    InvalidEnv { var: String, message: String },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `storage.container`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
///
/// - Linux: `~/.config/floodlog/config.toml`
/// - macOS: `~/Library/Application Support/floodlog/config.toml`
/// - Windows: `C:\Users\<user>\AppData\Roaming\floodlog\config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("floodlog")
        .join("config.toml")
}
