use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Database URL for SQLite.
    /// TOML: `basic.database_url`. Default: `sqlite://calrelay.db`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Upper bound of pooled connections.
    /// TOML: `basic.max_connections`. Default: `5`.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a statement waits on a locked database before failing.
    /// TOML: `basic.busy_timeout_secs`. Default: `5`.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    /// Optional TOML document with profiles and notifiers to import at startup.
    /// TOML: `basic.import_file`. Default: unset (skip import).
    #[serde(default)]
    pub import_file: Option<PathBuf>,

    /// Maximum number of cached notifiers.
    /// TOML: `basic.notifier_cache_capacity`. Default: `1024`.
    #[serde(default = "default_notifier_cache_capacity")]
    pub notifier_cache_capacity: u64,

    /// Lifetime of a cached notifier.
    /// TOML: `basic.notifier_cache_ttl_secs`. Default: `300`.
    #[serde(default = "default_notifier_cache_ttl_secs")]
    pub notifier_cache_ttl_secs: u64,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            loglevel: default_loglevel(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
            import_file: None,
            notifier_cache_capacity: default_notifier_cache_capacity(),
            notifier_cache_ttl_secs: default_notifier_cache_ttl_secs(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://calrelay.db".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_notifier_cache_capacity() -> u64 {
    1024
}

fn default_notifier_cache_ttl_secs() -> u64 {
    300
}
