//! # Configuration
//!
//! Layered configuration for the process engine, loaded with the `config`
//! crate. Sources in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. `config/portal-process.toml` (or an explicit file)
//! 3. Environment variables prefixed `PORTAL_PROCESS`, with `__` between
//!    sections, e.g. `PORTAL_PROCESS__DATABASE__MAX_CONNECTIONS=20`

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{PortalError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "config/portal-process.toml";
pub const ENV_PREFIX: &str = "PORTAL_PROCESS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/portal_process_development".to_string(),
            max_connections: 10,
            run_migrations: true,
        }
    }
}

/// Upper bound for `process.default_lock_seconds` (30 days)
pub const MAX_DEFAULT_LOCK_SECONDS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Reject step types that do not belong to their process type at flush
    pub enforce_step_types: bool,
    /// Lock duration used by callers that lock a process without an explicit expiry
    pub default_lock_seconds: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            enforce_step_types: true,
            default_lock_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalProcessConfig {
    pub database: DatabaseConfig,
    pub process: ProcessConfig,
    pub logging: LoggingConfig,
}

impl PortalProcessConfig {
    /// Load defaults, `config/portal-process.toml` if present, then the environment
    pub fn load() -> Result<Self> {
        let default_file = Path::new(DEFAULT_CONFIG_FILE);
        Self::load_from(default_file.exists().then_some(default_file))
    }

    /// Load defaults, an optional TOML file, then the environment
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            debug!(path = %path.display(), "loading process configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: PortalProcessConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(PortalError::ConfigurationError(
                "database.url must not be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(PortalError::ConfigurationError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        if self.process.default_lock_seconds == 0 {
            return Err(PortalError::ConfigurationError(
                "process.default_lock_seconds must be greater than 0".to_string(),
            ));
        }
        if self.process.default_lock_seconds > MAX_DEFAULT_LOCK_SECONDS {
            return Err(PortalError::ConfigurationError(format!(
                "process.default_lock_seconds must not exceed {MAX_DEFAULT_LOCK_SECONDS}"
            )));
        }
        Ok(())
    }

    /// Configuration as JSON with the database password masked, for logging
    pub fn debug_config(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(url) = value.pointer_mut("/database/url") {
            *url = serde_json::Value::String(mask_password(&self.database.url));
        }
        value
    }
}

fn mask_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.split_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
