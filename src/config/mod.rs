mod basic;

pub use basic::BasicConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::db::StoreOptions;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core settings (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "CALRELAY_";

impl Config {
    /// Builds a Figment that merges defaults, `config.toml` if present, and
    /// `CALRELAY_`-prefixed environment variables (`CALRELAY_BASIC__LOGLEVEL`).
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates the configuration.
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        let cfg: Self = figment.extract()?;
        if cfg.basic.database_url.trim().is_empty() {
            return Err(figment::Error::from(
                "basic.database_url must be set and non-empty".to_string(),
            ));
        }
        Ok(cfg)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_connections: self.basic.max_connections,
            busy_timeout: Duration::from_secs(self.basic.busy_timeout_secs),
        }
    }

    pub fn notifier_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.basic.notifier_cache_ttl_secs)
    }
}
