//! Per-user balances and withdrawal records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::OrderNumber;
use super::money::Amount;

/// Spendable balance and lifetime withdrawn total for one user.
///
/// Both fields stay non-negative: credits only add, and [`Balance::try_debit`]
/// refuses to go below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub current: Amount,
    pub withdrawn: Amount,
}

impl Balance {
    /// Create a balance from stored values.
    #[must_use]
    pub const fn new(current: Amount, withdrawn: Amount) -> Self {
        Self { current, withdrawn }
    }

    /// Add an accrual to the spendable balance.
    ///
    /// # Errors
    /// [`DomainError::BalanceOverflow`] if the sum does not fit; the balance
    /// is left untouched.
    pub fn credit(&mut self, amount: Amount) -> Result<(), DomainError> {
        self.current = self
            .current
            .checked_add(amount)
            .ok_or(DomainError::BalanceOverflow { amount })?;
        Ok(())
    }

    /// Move `amount` from spendable to withdrawn if it is covered.
    ///
    /// Returns `false` and leaves the balance untouched otherwise, including
    /// when the withdrawn total would overflow.
    pub fn try_debit(&mut self, amount: Amount) -> bool {
        if self.current < amount || amount <= Decimal::ZERO {
            return false;
        }
        let Some(withdrawn) = self.withdrawn.checked_add(amount) else {
            return false;
        };
        self.current -= amount;
        self.withdrawn = withdrawn;
        true
    }
}

/// A committed spend of loyalty points against an order reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Reference order number; must pass the same checksum as orders.
    pub order: OrderNumber,
    pub sum: Amount,
    pub processed_at: DateTime<Utc>,
}
