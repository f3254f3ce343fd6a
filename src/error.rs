use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Request outcomes that are surfaced to the caller and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("unknown user '{login}'")]
    UnknownUser { login: String },

    #[error("user '{login}' is already registered")]
    UserExists { login: String },

    #[error("order {number} belongs to another user")]
    OrderConflict { number: String },

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("withdrawal {number} was already recorded")]
    DuplicateWithdrawal { number: String },
}

/// Failures handing an order number to the poll worker pool.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    #[error("job queue is full")]
    QueueFull,

    #[error("engine is shutting down")]
    ShuttingDown,
}

/// Failures talking to the external accrual service.
#[derive(Error, Debug)]
pub enum AccrualError {
    #[error("order {number} is not registered with the accrual service yet")]
    NotRegistered { number: String },

    #[error("accrual service rate limit hit")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("accrual service answered with status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("accrual request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed accrual response: {0}")]
    Decode(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AccrualError {
    /// Whether the owning poll worker should wait and ask again.
    ///
    /// Only a status outside the known vocabulary stops polling; everything
    /// else (network trouble, 204, 429, odd status codes, bad bodies) is
    /// retried at the poll interval.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Domain(DomainError::UnknownAccrualStatus { .. }))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Accrual(#[from] AccrualError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
