//! Accrual service response types.
//!
//! Example body for `200 OK`:
//! ```json
//! {"order":"49927398716","status":"PROCESSED","accrual":500}
//! ```
//! `accrual` is omitted until the order is processed and may arrive either as
//! a JSON number or a string.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{AccrualStatus, OrderNumber, StatusReport};
use crate::error::AccrualError;

/// Raw `200 OK` body from the accrual service.
#[derive(Debug, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: String,
    #[serde(default)]
    pub accrual: Option<Decimal>,
}

impl AccrualResponse {
    /// Convert into a domain report for the order that was asked about.
    ///
    /// # Errors
    /// - [`AccrualError::Decode`] if the body names a different order
    /// - [`AccrualError::Domain`] if the status is outside the known vocabulary
    pub fn into_report(self, requested: &OrderNumber) -> Result<StatusReport, AccrualError> {
        if self.order.trim() != requested.as_str().trim() {
            return Err(AccrualError::Decode(format!(
                "response names order {} while polling {}",
                self.order, requested
            )));
        }
        let status: AccrualStatus = self.status.parse()?;

        Ok(StatusReport {
            number: requested.clone(),
            status,
            accrual: self.accrual,
        })
    }
}
