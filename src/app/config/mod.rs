//! Application configuration loading and validation.
//!
//! Values come from three layers, each overriding the previous one:
//! the TOML file, command-line flags, then environment variables
//! (`DATABASE_URI`, `ACCRUAL_SYSTEM_ADDRESS`, `COUNT_PROCESS`, `BUFFER_SIZE`,
//! `TIMEOUT_REQUEST`). Every field has a default, so an empty file is valid.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, Error, Result};

mod logging;
mod sections;

pub use logging::{LogFormat, LoggingConfig};
pub use sections::{AccrualConfig, DatabaseConfig, EngineConfig, EngineSettings};

pub const ENV_DATABASE_URI: &str = "DATABASE_URI";
pub const ENV_ACCRUAL_ADDRESS: &str = "ACCRUAL_SYSTEM_ADDRESS";
pub const ENV_POLL_WORKERS: &str = "COUNT_PROCESS";
pub const ENV_BUFFER_SIZE: &str = "BUFFER_SIZE";
pub const ENV_REQUEST_TIMEOUT: &str = "TIMEOUT_REQUEST";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub accrual: AccrualConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Optional values layered on top of the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub database_uri: Option<String>,
    pub accrual_address: Option<String>,
    pub poll_workers: Option<usize>,
    /// Sets the job queue capacity.
    pub buffer_size: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

impl Overrides {
    /// Read overrides from the process environment.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    #[allow(clippy::result_large_err)]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            database_uri: get(ENV_DATABASE_URI),
            accrual_address: get(ENV_ACCRUAL_ADDRESS),
            poll_workers: get(ENV_POLL_WORKERS)
                .map(|v| parse_number(ENV_POLL_WORKERS, &v))
                .transpose()?,
            buffer_size: get(ENV_BUFFER_SIZE)
                .map(|v| parse_number(ENV_BUFFER_SIZE, &v))
                .transpose()?,
            request_timeout_secs: get(ENV_REQUEST_TIMEOUT)
                .map(|v| parse_number(ENV_REQUEST_TIMEOUT, &v))
                .transpose()?,
        })
    }
}

#[allow(clippy::result_large_err)]
fn parse_number<T: FromStr>(field: &'static str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        Error::from(ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        })
    })
}

impl Config {
    /// Load and validate a TOML file without applying any overrides.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the effective configuration: file (or defaults), then `flags`,
    /// then the process environment.
    #[allow(clippy::result_large_err)]
    pub fn resolve(path: Option<&Path>, flags: &Overrides) -> Result<Self> {
        Self::resolve_with(path, flags, &Overrides::from_env()?)
    }

    /// Same as [`Config::resolve`] with an explicit environment layer.
    #[allow(clippy::result_large_err)]
    pub fn resolve_with(path: Option<&Path>, flags: &Overrides, env: &Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => Self::default(),
        };
        config.apply(flags);
        config.apply(env);
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Ok(toml::from_str(&content).map_err(ConfigError::Parse)?)
    }

    /// Overwrite every field the overrides carry.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(uri) = &overrides.database_uri {
            self.database.url.clone_from(uri);
        }
        if let Some(address) = &overrides.accrual_address {
            self.accrual.address.clone_from(address);
        }
        if let Some(workers) = overrides.poll_workers {
            self.engine.poll_workers = workers;
        }
        if let Some(size) = overrides.buffer_size {
            self.engine.queue_capacity = size;
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.accrual.request_timeout_secs = secs;
        }
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.url",
            }
            .into());
        }

        if self.accrual.address.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "accrual.address",
            }
            .into());
        }
        let url = Url::parse(&self.accrual.address).map_err(|e| ConfigError::InvalidValue {
            field: "accrual.address",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "accrual.address",
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }
            .into());
        }

        let positive: [(&'static str, u64); 8] = [
            ("accrual.request_timeout_secs", self.accrual.request_timeout_secs),
            ("engine.poll_workers", self.engine.poll_workers as u64),
            ("engine.reconcile_workers", self.engine.reconcile_workers as u64),
            ("engine.queue_capacity", self.engine.queue_capacity as u64),
            ("engine.poll_interval_ms", self.engine.poll_interval_ms),
            ("engine.submit_timeout_ms", self.engine.submit_timeout_ms),
            ("engine.persist_attempts", u64::from(self.engine.persist_attempts)),
            ("engine.persist_retry_ms", self.engine.persist_retry_ms),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be at least 1".into(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Engine settings with durations resolved.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings::from(&self.engine)
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
