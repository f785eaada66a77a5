//! # consult-config
//!
//! Layered configuration loading for Consult using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`CONSULT_*` prefix, `__` as separator)
//! 2. Project-level `.consult/config.toml`
//! 3. User-level `~/.config/consult/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `CONSULT_DATABASE__PATH` -> `database.path`,
//! `CONSULT_SERVER__BIND` -> `server.bind`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use consult_config::ConsultConfig;
//!
//! let config = ConsultConfig::load_with_dotenv().expect("config");
//! println!("database: {}", config.database.path);
//! ```

mod database;
mod error;
mod notifications;
mod server;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use notifications::NotificationsConfig;
pub use server::ServerConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project-local config file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = ".consult/config.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConsultConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl ConsultConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration after reading `.env` from the current directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be parsed.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer extra providers.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_PATH);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("CONSULT_").split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("consult").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = ConsultConfig::default();
        assert_eq!(config.database.path, "consult.db");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert!(config.notifications.enabled);
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config: ConsultConfig = ConsultConfig::figment().extract()?;
            assert_eq!(config.database.busy_timeout_ms, 5_000);
            assert_eq!(config.notifications.outbox_dir, ".consult/outbox");
            Ok(())
        });
    }
}
