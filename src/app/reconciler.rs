//! Reconciliation coordinator.
//!
//! Applies polled [`StatusReport`]s to the registry, the ledger and the
//! store. Reports for one order always arrive on the same lane (see
//! [`super::router`]), and [`Order::apply`] rejects anything that would move
//! an order backward.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ledger::BalanceLedger;
use super::registry::OrderRegistry;
use super::shutdown::Shutdown;
use crate::domain::{Amount, Balance, Order, OrderStatus, StatusReport, Transition};
use crate::port::Store;

/// Bounded retry for persistence writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            wait: Duration::from_secs(1),
        }
    }
}

/// What applying one report did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The order is not tracked; the report was dropped.
    Missing,
    /// The order already had this status.
    Unchanged,
    /// The report would have moved the order backward.
    Stale,
    /// The order moved to a non-terminal status.
    Progressed { persisted: bool },
    /// The report could not be applied; the order left the registry
    /// without being finalized in storage.
    Rejected,
    /// The order reached a terminal status and left the registry.
    Finalized {
        status: OrderStatus,
        credited: Option<Amount>,
        persisted: bool,
    },
}

/// Shared state for every reconciliation lane.
pub struct Reconciler {
    registry: Arc<OrderRegistry>,
    ledger: Arc<BalanceLedger>,
    store: Arc<dyn Store>,
    retry: RetryPolicy,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        registry: Arc<OrderRegistry>,
        ledger: Arc<BalanceLedger>,
        store: Arc<dyn Store>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            ledger,
            store,
            retry,
        }
    }

    /// Merge one report into tracked state and persist the result.
    ///
    /// The order stays locked for the whole call; a credited balance stays
    /// locked until its write has been attempted.
    pub async fn apply(&self, report: StatusReport) -> Applied {
        let Some(mut order) = self.registry.acquire(&report.number).await else {
            warn!(order = %report.number, status = %report.status, "Report for untracked order dropped");
            return Applied::Missing;
        };

        let to = match order.apply(&report) {
            Transition::Unchanged => {
                debug!(order = %report.number, status = %order.status, "Status already applied");
                return Applied::Unchanged;
            }
            Transition::Stale { current, reported } => {
                warn!(order = %report.number, %current, %reported, "Discarding stale status");
                return Applied::Stale;
            }
            Transition::Advanced { from, to } => {
                debug!(order = %report.number, %from, %to, "Order advanced");
                to
            }
        };

        if !to.is_terminal() {
            let persisted = self.persist(&order, None).await;
            return Applied::Progressed { persisted };
        }

        let credited = order.accrual;
        let persisted = match credited {
            Some(amount) => {
                let balance = match self.ledger.credit(&order.owner, amount).await {
                    Ok(balance) => balance,
                    Err(e) => {
                        // Stored status stays non-terminal, so the next start polls it again.
                        error!(
                            order = %order.number,
                            user = %order.owner,
                            accrual = %amount,
                            error = %e,
                            "Dropping order: accrual cannot be credited"
                        );
                        self.registry.remove(&order.number);
                        return Applied::Rejected;
                    }
                };
                let persisted = self.persist(&order, Some(balance.balance())).await;
                info!(
                    order = %order.number,
                    user = %order.owner,
                    accrual = %amount,
                    balance = %balance.current,
                    "Accrual credited"
                );
                persisted
            }
            None => self.persist(&order, None).await,
        };

        self.registry.remove(&order.number);
        info!(order = %order.number, status = %to, "Order finalized");
        Applied::Finalized {
            status: to,
            credited,
            persisted,
        }
    }

    async fn persist(&self, order: &Order, balance: Option<Balance>) -> bool {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            match self.store.save_order_status(order, balance.as_ref()).await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(order = %order.number, attempt, error = %e, "Failed to persist order status");
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.wait).await;
                    }
                }
            }
        }
        error!(
            order = %order.number,
            status = %order.status,
            attempts,
            "Giving up on persisting order status; in-memory state stands"
        );
        false
    }

    /// Spawn a task draining one lane until it closes or shutdown fires.
    pub fn spawn_lane(
        self: &Arc<Self>,
        lane: usize,
        mut reports: mpsc::Receiver<StatusReport>,
        mut shutdown: Shutdown,
    ) -> JoinHandle<()> {
        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            debug!(lane, "Reconciliation lane started");
            loop {
                let report = tokio::select! {
                    biased;
                    () = shutdown.wait() => break,
                    report = reports.recv() => report,
                };
                let Some(report) = report else {
                    break;
                };
                reconciler.apply(report).await;
            }
            debug!(lane, "Reconciliation lane stopped");
        })
    }
}
