//! Engine wiring and lifecycle.
//!
//! Startup order matters: balances are recovered before any credit can run,
//! workers start before unfinished orders are re-registered (registering
//! enqueues), and only then is the engine handed back to the caller.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::EngineSettings;
use super::ledger::BalanceLedger;
use super::poller::PollWorker;
use super::queue::JobQueue;
use super::reconciler::{Reconciler, RetryPolicy};
use super::recovery::RecoveryLoader;
use super::registry::{LoadReport, OrderRegistry};
use super::router::ResultRouter;
use super::service::LoyaltyService;
use super::shutdown::{self, Shutdown, ShutdownTrigger};
use crate::error::Result;
use crate::port::{AccrualSource, Store};

/// A running reconciliation engine.
pub struct Engine {
    service: LoyaltyService,
    registry: Arc<OrderRegistry>,
    ledger: Arc<BalanceLedger>,
    trigger: ShutdownTrigger,
    workers: Vec<JoinHandle<()>>,
    recovered: LoadReport,
}

impl Engine {
    /// Recover state, start both worker pools and resume unfinished orders.
    ///
    /// # Errors
    /// Returns the store error if recovery cannot read persisted state.
    pub async fn start(
        settings: EngineSettings,
        store: Arc<dyn Store>,
        source: Arc<dyn AccrualSource>,
    ) -> Result<Self> {
        let (trigger, listener) = shutdown::channel();
        let (queue, jobs) =
            JobQueue::new(settings.queue_capacity, settings.submit_timeout, listener.clone());
        let registry = Arc::new(OrderRegistry::new(queue));
        let ledger = Arc::new(BalanceLedger::new());
        let recovery =
            RecoveryLoader::new(Arc::clone(&store), Arc::clone(&registry), Arc::clone(&ledger));

        recovery.load_balances().await?;

        let (router, lanes) = ResultRouter::new(settings.reconcile_workers, settings.queue_capacity);
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
            Arc::clone(&store),
            RetryPolicy {
                attempts: settings.persist_attempts,
                wait: settings.persist_retry,
            },
        ));

        let mut workers = Vec::with_capacity(lanes.len() + settings.poll_workers);
        for (lane, reports) in lanes.into_iter().enumerate() {
            workers.push(reconciler.spawn_lane(lane, reports, listener.clone()));
        }
        for id in 0..settings.poll_workers {
            let worker = PollWorker::new(
                id,
                Arc::clone(&source),
                jobs.clone(),
                router.clone(),
                settings.poll_interval,
                listener.clone(),
            );
            workers.push(worker.spawn());
        }
        info!(
            poll_workers = settings.poll_workers,
            reconcile_lanes = router.lanes(),
            queue_capacity = settings.queue_capacity,
            "Engine workers started"
        );

        let recovered = match recovery.load_orders().await {
            Ok((report, backlog)) => {
                workers.extend(backlog);
                report
            }
            Err(e) => {
                trigger.trigger();
                join_all(workers).await;
                return Err(e);
            }
        };

        let service = LoyaltyService::new(store, Arc::clone(&registry), Arc::clone(&ledger));
        Ok(Self {
            service,
            registry,
            ledger,
            trigger,
            workers,
            recovered,
        })
    }

    /// Account-level operations.
    #[must_use]
    pub fn service(&self) -> &LoyaltyService {
        &self.service
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<OrderRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<BalanceLedger> {
        &self.ledger
    }

    /// What startup recovery re-registered.
    #[must_use]
    pub fn recovered(&self) -> LoadReport {
        self.recovered
    }

    /// A listener that resolves when the engine begins shutting down.
    #[must_use]
    pub fn shutdown_signal(&self) -> Shutdown {
        self.trigger.subscribe()
    }

    /// Signal every worker and wait for them to unwind.
    pub async fn shutdown(self) {
        info!(tracked = self.registry.len(), "Engine shutting down");
        self.trigger.trigger();
        join_all(self.workers).await;
        info!("Engine stopped");
    }
}

async fn join_all(workers: Vec<JoinHandle<()>>) {
    for handle in workers {
        if let Err(e) = handle.await {
            warn!(error = %e, "Worker task ended abnormally");
        }
    }
}
