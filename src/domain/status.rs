//! Order status vocabularies and the normalizer between them.
//!
//! The accrual service speaks [`AccrualStatus`]; persisted and tracked orders
//! carry [`OrderStatus`]. [`AccrualStatus::normalize`] is the single mapping
//! between the two and is exhaustive by construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Internal order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Processing,
    Processed,
    Invalid,
}

impl OrderStatus {
    /// Terminal orders are never polled again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }

    /// Position along the lifecycle. Status only ever moves to a higher rank.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::New => 0,
            Self::Processing => 1,
            Self::Processed | Self::Invalid => 2,
        }
    }

    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Processed => "PROCESSED",
            Self::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            other => Err(DomainError::UnknownOrderStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// Status as reported by the external accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Processed,
    Invalid,
}

impl AccrualStatus {
    /// Map the external vocabulary onto internal order status.
    ///
    /// | external   | internal   |
    /// |------------|------------|
    /// | REGISTERED | PROCESSING |
    /// | PROCESSING | PROCESSING |
    /// | PROCESSED  | PROCESSED  |
    /// | INVALID    | INVALID    |
    #[must_use]
    pub const fn normalize(self) -> OrderStatus {
        match self {
            Self::Registered | Self::Processing => OrderStatus::Processing,
            Self::Processed => OrderStatus::Processed,
            Self::Invalid => OrderStatus::Invalid,
        }
    }

    /// Whether the accrual service has finished with this order.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Processing => "PROCESSING",
            Self::Processed => "PROCESSED",
            Self::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for AccrualStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccrualStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTERED" => Ok(Self::Registered),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            other => Err(DomainError::UnknownAccrualStatus {
                status: other.to_string(),
            }),
        }
    }
}
