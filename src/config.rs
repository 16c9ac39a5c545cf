//! Configuration management for alertbus
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer defaults, an `alertbus.toml` file, `ALERTBUS_`
//! environment variables and command-line overrides.

use crate::cli::Cli;
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "alertbus.toml";

const DEFAULT_SECRET_KEY: &str = "SW2YcwTIb9zpOOhoPsMm";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level, used when `RUST_LOG` is not set.
    pub log_level: String,
    /// The organization the command-line user acts in.
    pub org_id: i64,
    /// Offer the notifier plugins of the unified alerting engine.
    pub unified_alerting: bool,
    pub secrets: SecretsConfig,
    pub fixture: FixtureConfig,
}

/// Secure settings encryption.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SecretsConfig {
    /// Secret from which the encryption key is derived.
    pub secret_key: String,
}

/// The YAML fixture that seeds the in-memory store.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct FixtureConfig {
    pub path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            org_id: 1,
            unified_alerting: false,
            secrets: SecretsConfig::default(),
            fixture: FixtureConfig::default(),
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration by layering defaults, the TOML file, the
    /// environment and `cli`.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            // e.g. ALERTBUS_ORG_ID=2 or ALERTBUS_SECRETS__SECRET_KEY=...
            .merge(Env::prefixed("ALERTBUS_").split("__"))
            .merge(cli.clone())
            .extract()
            .with_context(|| format!("Failed to load configuration ({})", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.org_id <= 0 {
            bail!("org_id must be positive, got {}", self.org_id);
        }
        if self.secrets.secret_key.is_empty() {
            bail!("secrets.secret_key must not be empty");
        }
        Ok(())
    }
}
