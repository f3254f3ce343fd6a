//! Monetary types for loyalty point amounts.

use rust_decimal::Decimal;

use super::error::DomainError;

/// Loyalty point amount represented as a Decimal for precision.
pub type Amount = Decimal;

/// Reject zero and negative amounts.
///
/// # Errors
/// Returns [`DomainError::NonPositiveAmount`] when `amount <= 0`.
pub fn ensure_positive(amount: Amount) -> Result<Amount, DomainError> {
    if amount > Decimal::ZERO {
        Ok(amount)
    } else {
        Err(DomainError::NonPositiveAmount { amount })
    }
}
