//! `[database]`, `[accrual]` and `[engine]` sections.

use std::time::Duration;

use serde::Deserialize;

/// Storage location.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL or path. `sqlite://` prefix is optional.
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "sqlite://loyalty.db".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// External accrual service connection.
#[derive(Debug, Clone, Deserialize)]
pub struct AccrualConfig {
    /// Base address, e.g. `http://localhost:8090`.
    #[serde(default = "default_accrual_address")]
    pub address: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_accrual_address() -> String {
    "http://localhost:8090".into()
}

const fn default_request_timeout_secs() -> u64 {
    5
}

impl AccrualConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            address: default_accrual_address(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Worker pools, queue sizing and retry timing.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_poll_workers")]
    pub poll_workers: usize,
    #[serde(default = "default_reconcile_workers")]
    pub reconcile_workers: usize,
    /// Capacity of the job queue and of each reconciliation lane.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long a submission waits for queue space before giving up.
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,
    #[serde(default = "default_persist_attempts")]
    pub persist_attempts: u32,
    #[serde(default = "default_persist_retry_ms")]
    pub persist_retry_ms: u64,
}

const fn default_poll_workers() -> usize {
    10
}

const fn default_reconcile_workers() -> usize {
    4
}

const fn default_queue_capacity() -> usize {
    1000
}

const fn default_poll_interval_ms() -> u64 {
    10_000
}

const fn default_submit_timeout_ms() -> u64 {
    5_000
}

const fn default_persist_attempts() -> u32 {
    3
}

const fn default_persist_retry_ms() -> u64 {
    1_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_workers: default_poll_workers(),
            reconcile_workers: default_reconcile_workers(),
            queue_capacity: default_queue_capacity(),
            poll_interval_ms: default_poll_interval_ms(),
            submit_timeout_ms: default_submit_timeout_ms(),
            persist_attempts: default_persist_attempts(),
            persist_retry_ms: default_persist_retry_ms(),
        }
    }
}

/// Runtime settings handed to the engine, with durations resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub poll_workers: usize,
    pub reconcile_workers: usize,
    pub queue_capacity: usize,
    pub poll_interval: Duration,
    pub submit_timeout: Duration,
    pub persist_attempts: u32,
    pub persist_retry: Duration,
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            poll_workers: config.poll_workers,
            reconcile_workers: config.reconcile_workers,
            queue_capacity: config.queue_capacity,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            submit_timeout: Duration::from_millis(config.submit_timeout_ms),
            persist_attempts: config.persist_attempts,
            persist_retry: Duration::from_millis(config.persist_retry_ms),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}
