//! Accrual service port.

use async_trait::async_trait;

use crate::domain::{OrderNumber, StatusReport};
use crate::error::AccrualError;

/// Source of accrual status reports for individual orders.
///
/// Implementations must be thread-safe; every poll worker shares one source.
/// Transient conditions (order not registered yet, rate limiting, transport
/// failures) are returned as errors and classified by
/// [`AccrualError::is_transient`].
#[async_trait]
pub trait AccrualSource: Send + Sync {
    /// Fetch the current status of one order.
    async fn fetch(&self, number: &OrderNumber) -> Result<StatusReport, AccrualError>;
}
