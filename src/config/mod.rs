//! Configuration management.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `$REDDIT2DYNALIST_CONFIG_PATH`, or
//!    `<config_dir>/reddit2dynalist/config.toml`)
//! 3. Environment variables
//!
//! ```toml
//! [sync]
//! interval_secs = 300
//! fetch_limit = 25
//!
//! [reddit]
//! client_id = "abc"
//! username = "someone"
//!
//! [dynalist]
//! document_name = "Reddit"
//! ```

mod http;

pub use http::HttpConfig;

use crate::gc::RetentionConfig;
use crate::rendering::DEFAULT_LINK_HOST;
use crate::sink::DynalistClient;
use crate::source::{DEFAULT_FETCH_LIMIT, RedditCredentials};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "REDDIT2DYNALIST_CONFIG_PATH";

/// Default polling interval (5 minutes).
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Default per-cycle deadline.
pub const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 30;

/// Default Dynalist document name.
pub const DEFAULT_DOCUMENT_NAME: &str = "Reddit";

/// Main configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Sync cycle and scheduling settings.
    pub sync: SyncSettings,
    /// Dedup record retention.
    pub retention: RetentionConfig,
    /// Reddit credentials.
    pub reddit: RedditSettings,
    /// Dynalist settings.
    pub dynalist: DynalistSettings,
    /// Outbound HTTP timeouts.
    pub http: HttpConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// Sync cycle and scheduling settings.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Candidates fetched per cycle.
    pub fetch_limit: usize,
    /// Deadline for a single cycle.
    pub cycle_timeout: Duration,
    /// Path of the dedup state file.
    pub state_path: PathBuf,
    /// Host used when rendering permalinks.
    pub link_host: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            cycle_timeout: Duration::from_secs(DEFAULT_CYCLE_TIMEOUT_SECS),
            state_path: crate::storage::default_state_path(),
            link_host: DEFAULT_LINK_HOST.to_string(),
        }
    }
}

/// Reddit script-app credentials. All four are required to run.
#[derive(Debug, Clone, Default)]
pub struct RedditSettings {
    /// OAuth client ID.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<SecretString>,
    /// Account username.
    pub username: Option<String>,
    /// Account password.
    pub password: Option<SecretString>,
}

/// Dynalist settings.
#[derive(Debug, Clone)]
pub struct DynalistSettings {
    /// API token. Required to run.
    pub api_key: Option<SecretString>,
    /// Name of the document entries are appended to.
    pub document_name: String,
    /// Document ID; skips name resolution when set.
    pub document_id: Option<String>,
    /// API base URL.
    pub base_url: String,
}

impl Default for DynalistSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
            document_id: None,
            base_url: DynalistClient::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Metrics settings.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSettings {
    /// Whether to install the Prometheus exporter.
    pub enabled: bool,
    /// Listener port for the exporter.
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Sync section.
    pub sync: Option<ConfigFileSync>,
    /// Retention section.
    pub retention: Option<ConfigFileRetention>,
    /// Reddit section.
    pub reddit: Option<ConfigFileReddit>,
    /// Dynalist section.
    pub dynalist: Option<ConfigFileDynalist>,
    /// HTTP section.
    pub http: Option<ConfigFileHttp>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics section.
    pub metrics: Option<ConfigFileMetrics>,
}

/// Sync section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileSync {
    /// Polling interval in seconds.
    pub interval_secs: Option<u64>,
    /// Candidates fetched per cycle.
    pub fetch_limit: Option<usize>,
    /// Cycle deadline in seconds.
    pub cycle_timeout_secs: Option<u64>,
    /// State file path.
    pub state_path: Option<String>,
    /// Link host.
    pub link_host: Option<String>,
}

/// Retention section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRetention {
    /// Retention window in days.
    pub days: Option<u32>,
}

/// Reddit section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileReddit {
    /// Client ID.
    pub client_id: Option<String>,
    /// Client secret.
    pub client_secret: Option<String>,
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
}

/// Dynalist section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDynalist {
    /// API token.
    pub api_key: Option<String>,
    /// Document name.
    pub document_name: Option<String>,
    /// Document ID.
    pub document_id: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
}

/// HTTP section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileHttp {
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Format.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Metrics section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMetrics {
    /// Enabled.
    pub enabled: Option<bool>,
    /// Port.
    pub port: Option<u16>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`].
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Returns default configuration if no config file is found or it cannot
    /// be parsed.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(dirs) = directories::ProjectDirs::from("", "", "reddit2dynalist") else {
            return Self::default();
        };

        let path = dirs.config_dir().join("config.toml");
        if path.exists() {
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(error = %e, "Ignoring unreadable config file"),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `AppConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(sync) = file.sync {
            if let Some(secs) = sync.interval_secs.filter(|s| *s > 0) {
                config.sync.interval = Duration::from_secs(secs);
            }
            if let Some(limit) = sync.fetch_limit.filter(|l| *l > 0) {
                config.sync.fetch_limit = limit;
            }
            if let Some(secs) = sync.cycle_timeout_secs.filter(|s| *s > 0) {
                config.sync.cycle_timeout = Duration::from_secs(secs);
            }
            if let Some(path) = non_empty(sync.state_path) {
                config.sync.state_path = PathBuf::from(path);
            }
            if let Some(host) = non_empty(sync.link_host) {
                config.sync.link_host = host;
            }
        }
        if let Some(days) = file.retention.and_then(|r| r.days).filter(|d| *d > 0) {
            config.retention = config.retention.with_days(days);
        }
        if let Some(reddit) = file.reddit {
            config.reddit.client_id = non_empty(reddit.client_id);
            config.reddit.client_secret = non_empty(reddit.client_secret).map(SecretString::from);
            config.reddit.username = non_empty(reddit.username);
            config.reddit.password = non_empty(reddit.password).map(SecretString::from);
        }
        if let Some(dynalist) = file.dynalist {
            config.dynalist.api_key = non_empty(dynalist.api_key).map(SecretString::from);
            if let Some(name) = non_empty(dynalist.document_name) {
                config.dynalist.document_name = name;
            }
            config.dynalist.document_id = non_empty(dynalist.document_id);
            if let Some(url) = non_empty(dynalist.base_url) {
                config.dynalist.base_url = url;
            }
        }
        if let Some(http) = file.http {
            if let Some(v) = http.timeout_ms {
                config.http.timeout_ms = v;
            }
            if let Some(v) = http.connect_timeout_ms {
                config.http.connect_timeout_ms = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.format = non_empty(logging.format);
            config.logging.filter = non_empty(logging.filter);
            config.logging.file = non_empty(logging.file).map(PathBuf::from);
        }
        if let Some(metrics) = file.metrics {
            if let Some(v) = metrics.enabled {
                config.metrics.enabled = v;
            }
            if let Some(v) = metrics.port {
                config.metrics.port = v;
            }
        }

        config
    }

    /// Applies overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Recognised variables: `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`,
    /// `REDDIT_USERNAME`, `REDDIT_PASSWORD`, `DYNALIST_API_KEY`, and the
    /// `REDDIT2DYNALIST_*` family (`STATE_PATH`, `INTERVAL_SECS`,
    /// `FETCH_LIMIT`, `RETENTION_DAYS`, `DOCUMENT`, `DOCUMENT_ID`,
    /// `LOG_FORMAT`, `METRICS_ENABLED`, `METRICS_PORT`). Empty values are
    /// ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(v) = get("REDDIT_CLIENT_ID") {
            self.reddit.client_id = Some(v);
        }
        if let Some(v) = get("REDDIT_CLIENT_SECRET") {
            self.reddit.client_secret = Some(SecretString::from(v));
        }
        if let Some(v) = get("REDDIT_USERNAME") {
            self.reddit.username = Some(v);
        }
        if let Some(v) = get("REDDIT_PASSWORD") {
            self.reddit.password = Some(SecretString::from(v));
        }
        if let Some(v) = get("DYNALIST_API_KEY") {
            self.dynalist.api_key = Some(SecretString::from(v));
        }
        if let Some(v) = get("REDDIT2DYNALIST_STATE_PATH") {
            self.sync.state_path = PathBuf::from(v);
        }
        if let Some(secs) = get("REDDIT2DYNALIST_INTERVAL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            self.sync.interval = Duration::from_secs(secs);
        }
        if let Some(limit) = get("REDDIT2DYNALIST_FETCH_LIMIT")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|l| *l > 0)
        {
            self.sync.fetch_limit = limit;
        }
        self.retention = self.retention.with_overrides_from(&get);
        if let Some(v) = get("REDDIT2DYNALIST_DOCUMENT") {
            self.dynalist.document_name = v;
        }
        if let Some(v) = get("REDDIT2DYNALIST_DOCUMENT_ID") {
            self.dynalist.document_id = Some(v);
        }
        if let Some(v) = get("REDDIT2DYNALIST_LOG_FORMAT") {
            self.logging.format = Some(v);
        }
        if let Some(enabled) = get("REDDIT2DYNALIST_METRICS_ENABLED").and_then(|v| parse_bool(&v))
        {
            self.metrics.enabled = enabled;
        }
        if let Some(port) = get("REDDIT2DYNALIST_METRICS_PORT").and_then(|v| v.parse::<u16>().ok())
        {
            self.metrics.port = port;
        }

        self
    }

    /// Checks that everything needed to run a sync is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] listing every missing setting.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.reddit.client_id.is_none() {
            missing.push("REDDIT_CLIENT_ID");
        }
        if self.reddit.client_secret.is_none() {
            missing.push("REDDIT_CLIENT_SECRET");
        }
        if self.reddit.username.is_none() {
            missing.push("REDDIT_USERNAME");
        }
        if self.reddit.password.is_none() {
            missing.push("REDDIT_PASSWORD");
        }
        if self.dynalist.api_key.is_none() {
            missing.push("DYNALIST_API_KEY");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }

    /// Reddit credentials, if complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any credential is missing.
    pub fn reddit_credentials(&self) -> Result<RedditCredentials> {
        match (
            &self.reddit.client_id,
            &self.reddit.client_secret,
            &self.reddit.username,
            &self.reddit.password,
        ) {
            (Some(client_id), Some(client_secret), Some(username), Some(password)) => {
                Ok(RedditCredentials {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    username: username.clone(),
                    password: password.clone(),
                })
            },
            _ => Err(Error::InvalidInput(
                "Reddit credentials are incomplete".to_string(),
            )),
        }
    }

    /// Dynalist API token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the token is missing.
    pub fn dynalist_api_key(&self) -> Result<SecretString> {
        self.dynalist
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().is_empty())
            .ok_or_else(|| Error::InvalidInput("DYNALIST_API_KEY not set".to_string()))
    }
}
