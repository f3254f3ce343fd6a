//! Tracked orders and the status reports polled for them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{Login, OrderNumber};
use super::money::Amount;
use super::status::{AccrualStatus, OrderStatus};

/// A loyalty-bearing order owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub number: OrderNumber,
    pub owner: Login,
    pub status: OrderStatus,
    /// Present only once a positive credit is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Amount>,
    pub uploaded_at: DateTime<Utc>,
}

/// Outcome of merging a [`StatusReport`] into an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order already carries the reported status.
    Unchanged,
    /// The report would move the order backward; it was ignored.
    Stale {
        current: OrderStatus,
        reported: OrderStatus,
    },
    /// The order moved forward.
    Advanced { from: OrderStatus, to: OrderStatus },
}

impl Order {
    /// A freshly submitted order.
    #[must_use]
    pub fn new(number: OrderNumber, owner: Login) -> Self {
        Self {
            number,
            owner,
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: Utc::now(),
        }
    }

    /// Merge a polled report into this order.
    ///
    /// Equal status is a no-op, which makes redelivery of the same report
    /// idempotent. A report ranked below the current status is stale and
    /// leaves the order untouched.
    pub fn apply(&mut self, report: &StatusReport) -> Transition {
        let target = report.target_status();

        if target == self.status {
            return Transition::Unchanged;
        }
        if self.status.is_terminal() || target.rank() < self.status.rank() {
            return Transition::Stale {
                current: self.status,
                reported: target,
            };
        }

        let from = self.status;
        self.status = target;
        self.accrual = report.credit();
        Transition::Advanced { from, to: target }
    }
}

/// One observation of an order's state at the accrual service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub number: OrderNumber,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Amount>,
}

impl StatusReport {
    /// Internal status this report maps to.
    #[must_use]
    pub fn target_status(&self) -> OrderStatus {
        self.status.normalize()
    }

    /// The accrual amount when it is strictly positive.
    #[must_use]
    pub fn credit(&self) -> Option<Amount> {
        self.accrual.filter(|a| *a > Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order::new(
            OrderNumber::parse("49927398716").unwrap(),
            Login::parse("alice").unwrap(),
        )
    }

    fn report(status: AccrualStatus, accrual: Option<Amount>) -> StatusReport {
        StatusReport {
            number: OrderNumber::parse("49927398716").unwrap(),
            status,
            accrual,
        }
    }

    #[test]
    fn new_orders_start_without_accrual() {
        let o = order();
        assert_eq!(o.status, OrderStatus::New);
        assert!(o.accrual.is_none());
    }

    #[test]
    fn registered_advances_new_to_processing() {
        let mut o = order();
        let t = o.apply(&report(AccrualStatus::Registered, None));
        assert_eq!(
            t,
            Transition::Advanced {
                from: OrderStatus::New,
                to: OrderStatus::Processing
            }
        );
        assert_eq!(o.status, OrderStatus::Processing);
    }

    #[test]
    fn repeated_status_is_unchanged() {
        let mut o = order();
        o.apply(&report(AccrualStatus::Processed, Some(dec!(500))));
        let t = o.apply(&report(AccrualStatus::Processed, Some(dec!(500))));
        assert_eq!(t, Transition::Unchanged);
        assert_eq!(o.accrual, Some(dec!(500)));
    }

    #[test]
    fn terminal_orders_never_move_again() {
        let mut o = order();
        o.apply(&report(AccrualStatus::Invalid, None));
        let t = o.apply(&report(AccrualStatus::Processed, Some(dec!(10))));
        assert!(matches!(t, Transition::Stale { .. }));
        assert_eq!(o.status, OrderStatus::Invalid);
        assert!(o.accrual.is_none());
    }

    #[test]
    fn backward_report_is_stale() {
        let mut o = order();
        o.apply(&report(AccrualStatus::Processed, Some(dec!(1))));
        let t = o.apply(&report(AccrualStatus::Processing, None));
        assert_eq!(
            t,
            Transition::Stale {
                current: OrderStatus::Processed,
                reported: OrderStatus::Processing
            }
        );
    }

    #[test]
    fn zero_accrual_is_not_a_credit() {
        assert_eq!(report(AccrualStatus::Processed, Some(dec!(0))).credit(), None);
        assert_eq!(
            report(AccrualStatus::Processed, Some(dec!(12.5))).credit(),
            Some(dec!(12.5))
        );
    }
}
