//! Domain validation errors.
//!
//! These are returned by the validating constructors in [`super::id`] and by
//! status parsing. They are always raised before a value enters the engine
//! and are never retried.

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The order number failed the mod-10 checksum or contains non-digits.
    #[error("invalid order number '{number}'")]
    InvalidOrderNumber {
        /// The rejected input.
        number: String,
    },

    /// The login does not match the accepted format.
    #[error("invalid login '{login}': {reason}")]
    InvalidLogin {
        /// The rejected input.
        login: String,
        /// Which rule was broken.
        reason: &'static str,
    },

    /// Credits and withdrawals must move a strictly positive amount.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The invalid amount that was provided.
        amount: rust_decimal::Decimal,
    },

    /// Adding an amount would overflow the balance's decimal range.
    #[error("balance overflow adding {amount}")]
    BalanceOverflow {
        /// The amount that could not be added.
        amount: rust_decimal::Decimal,
    },

    /// A stored order carries a status outside the internal vocabulary.
    #[error("unknown order status '{status}'")]
    UnknownOrderStatus {
        /// The raw status string.
        status: String,
    },

    /// The accrual service reported a status outside its known vocabulary.
    #[error("unknown accrual status '{status}'")]
    UnknownAccrualStatus {
        /// The raw status string.
        status: String,
    },
}
