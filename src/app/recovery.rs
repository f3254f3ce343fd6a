//! Startup recovery.
//!
//! Balances are loaded before any worker runs so the first credit lands on
//! the stored value. Unfinished orders are loaded after the workers start,
//! because registering an order also enqueues it.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use super::ledger::BalanceLedger;
use super::registry::{LoadReport, OrderRegistry};
use crate::error::Result;
use crate::port::Store;

/// Reloads persisted state into the ledger and registry.
pub struct RecoveryLoader {
    store: Arc<dyn Store>,
    registry: Arc<OrderRegistry>,
    ledger: Arc<BalanceLedger>,
}

impl RecoveryLoader {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<OrderRegistry>,
        ledger: Arc<BalanceLedger>,
    ) -> Self {
        Self {
            store,
            registry,
            ledger,
        }
    }

    /// Load every stored balance into the ledger.
    ///
    /// # Errors
    /// Returns the store error if balances cannot be read.
    pub async fn load_balances(&self) -> Result<usize> {
        let balances = self.store.all_balances().await?;
        let loaded = self.ledger.load(balances);
        info!(balances = loaded, "Balances recovered");
        Ok(loaded)
    }

    /// Register every non-terminal stored order for polling.
    ///
    /// Orders beyond the queue's free space are fed in by a background task,
    /// returned alongside the report so the caller can join it.
    ///
    /// # Errors
    /// Returns the store error if orders cannot be read.
    pub async fn load_orders(&self) -> Result<(LoadReport, Option<JoinHandle<()>>)> {
        let pending = self.store.pending_orders().await?;
        let (report, backlog) = self.registry.load(pending);
        if report.deferred > 0 {
            info!(
                deferred = report.deferred,
                "Queue is full; remaining unfinished orders will be queued as workers free up"
            );
        }
        info!(orders = report.registered, "Unfinished orders recovered");
        Ok((report, self.registry.spawn_backlog(backlog)))
    }
}
