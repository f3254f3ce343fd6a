//! Active-order registry.
//!
//! Holds every order that is still being polled. Each entry carries its own
//! async mutex; callers take scoped access through [`OrderRegistry::acquire`]
//! and the lock is released when the returned guard drops, on every path.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::queue::JobQueue;
use crate::domain::{Order, OrderNumber};
use crate::error::DispatchError;

/// Concurrent keyed store of non-terminal orders.
#[derive(Debug)]
pub struct OrderRegistry {
    orders: DashMap<OrderNumber, Arc<Mutex<Order>>>,
    queue: JobQueue,
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Orders now tracked for polling.
    pub registered: usize,
    /// Tracked orders that did not fit in the queue yet; see
    /// [`OrderRegistry::spawn_backlog`].
    pub deferred: usize,
}

impl OrderRegistry {
    #[must_use]
    pub fn new(queue: JobQueue) -> Self {
        Self {
            orders: DashMap::new(),
            queue,
        }
    }

    /// Register an order and enqueue it for polling.
    ///
    /// Terminal orders are never registered. Inserting a number that is
    /// already tracked is a no-op. If the enqueue fails the entry is rolled
    /// back so that nothing is tracked without a poller.
    ///
    /// # Errors
    /// Propagates the [`DispatchError`] from the job queue.
    pub async fn insert(&self, order: Order) -> Result<(), DispatchError> {
        if order.status.is_terminal() {
            debug!(order = %order.number, status = %order.status, "Skipping terminal order");
            return Ok(());
        }

        let number = order.number.clone();
        match self.orders.entry(number.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Ok(()),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(order)));
            }
        }

        if let Err(e) = self.queue.submit(number.clone()).await {
            self.orders.remove(&number);
            warn!(order = %number, error = %e, "Failed to enqueue order");
            return Err(e);
        }
        Ok(())
    }

    /// Snapshot of a tracked order.
    pub async fn get(&self, number: &OrderNumber) -> Option<Order> {
        let entry = self.entry(number)?;
        let order = entry.lock().await;
        Some(order.clone())
    }

    /// Exclusive access to a tracked order until the guard drops.
    pub async fn acquire(&self, number: &OrderNumber) -> Option<OwnedMutexGuard<Order>> {
        let entry = self.entry(number)?;
        Some(entry.lock_owned().await)
    }

    /// Replace a tracked order's state. Returns `false` if it is not tracked.
    pub async fn update(&self, number: &OrderNumber, order: Order) -> bool {
        match self.acquire(number).await {
            Some(mut guard) => {
                *guard = order;
                true
            }
            None => false,
        }
    }

    /// Stop tracking an order. Returns `false` if it was not tracked.
    pub fn remove(&self, number: &OrderNumber) -> bool {
        self.orders.remove(number).is_some()
    }

    /// Register many orders at once, typically at startup.
    ///
    /// Every non-terminal order is tracked. Orders that fit in the queue are
    /// enqueued right away; the rest come back as a backlog for
    /// [`OrderRegistry::spawn_backlog`]. Never waits for queue space.
    pub fn load<I>(&self, orders: I) -> (LoadReport, Vec<OrderNumber>)
    where
        I: IntoIterator<Item = Order>,
    {
        let mut report = LoadReport::default();
        let mut backlog = Vec::new();
        for order in orders {
            if order.status.is_terminal() {
                continue;
            }
            let number = order.number.clone();
            match self.orders.entry(number.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Mutex::new(order)));
                }
            }
            match self.queue.try_submit(number.clone()) {
                Ok(()) => report.registered += 1,
                Err(DispatchError::QueueFull) => {
                    report.registered += 1;
                    backlog.push(number);
                }
                Err(DispatchError::ShuttingDown) => {
                    self.orders.remove(&number);
                }
            }
        }
        report.deferred = backlog.len();
        (report, backlog)
    }

    /// Hand a load backlog to the queue from a background task, waiting for
    /// space as workers free up. Stops early only on shutdown.
    #[must_use]
    pub fn spawn_backlog(&self, backlog: Vec<OrderNumber>) -> Option<JoinHandle<()>> {
        if backlog.is_empty() {
            return None;
        }
        let queue = self.queue.clone();
        Some(tokio::spawn(async move {
            let total = backlog.len();
            for (queued, number) in backlog.into_iter().enumerate() {
                if let Err(e) = queue.submit_waiting(number).await {
                    debug!(queued, remaining = total - queued, error = %e, "Backlog feed stopped");
                    return;
                }
            }
            info!(orders = total, "Backlog fully queued");
        }))
    }

    #[must_use]
    pub fn contains(&self, number: &OrderNumber) -> bool {
        self.orders.contains_key(number)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Numbers of every tracked order, unordered.
    #[must_use]
    pub fn numbers(&self) -> Vec<OrderNumber> {
        self.orders.iter().map(|e| e.key().clone()).collect()
    }

    fn entry(&self, number: &OrderNumber) -> Option<Arc<Mutex<Order>>> {
        self.orders.get(number).map(|e| Arc::clone(e.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::queue::JobReceiver;
    use crate::app::shutdown::{self, Shutdown, ShutdownTrigger};
    use crate::domain::{Login, OrderStatus};
    use std::time::Duration;

    fn setup(capacity: usize) -> (OrderRegistry, JobReceiver, ShutdownTrigger, Shutdown) {
        let (trigger, listener) = shutdown::channel();
        let (queue, jobs) = JobQueue::new(capacity, Duration::from_millis(20), listener.clone());
        (OrderRegistry::new(queue), jobs, trigger, listener)
    }

    fn order(number: &str) -> Order {
        Order::new(
            OrderNumber::parse(number).unwrap(),
            Login::parse("alice").unwrap(),
        )
    }

    #[tokio::test]
    async fn insert_tracks_and_enqueues() {
        let (registry, jobs, _trigger, mut listener) = setup(4);
        let o = order("49927398716");

        registry.insert(o.clone()).await.unwrap();
        assert!(registry.contains(&o.number));
        assert_eq!(registry.get(&o.number).await, Some(o.clone()));
        assert_eq!(jobs.next(&mut listener).await, Some(o.number));
    }

    #[tokio::test]
    async fn duplicate_insert_enqueues_once() {
        let (registry, _jobs, _trigger, _listener) = setup(4);
        let o = order("49927398716");

        registry.insert(o.clone()).await.unwrap();
        registry.insert(o).await.unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.queue.pending(), 1);
    }

    #[tokio::test]
    async fn failed_enqueue_rolls_back_the_entry() {
        let (registry, _jobs, _trigger, _listener) = setup(1);
        registry.insert(order("49927398716")).await.unwrap();

        let err = registry.insert(order("79927398713")).await.unwrap_err();
        assert_eq!(err, DispatchError::QueueFull);
        assert!(!registry.contains(&OrderNumber::parse("79927398713").unwrap()));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn terminal_orders_are_not_tracked() {
        let (registry, _jobs, _trigger, _listener) = setup(4);
        let mut o = order("49927398716");
        o.status = OrderStatus::Invalid;

        registry.insert(o.clone()).await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn update_and_remove() {
        let (registry, _jobs, _trigger, _listener) = setup(4);
        let mut o = order("49927398716");
        registry.insert(o.clone()).await.unwrap();

        o.status = OrderStatus::Processing;
        assert!(registry.update(&o.number, o.clone()).await);
        assert_eq!(
            registry.get(&o.number).await.map(|o| o.status),
            Some(OrderStatus::Processing)
        );

        assert!(registry.remove(&o.number));
        assert!(!registry.remove(&o.number));
        assert!(!registry.update(&o.number, o.clone()).await);
        assert!(registry.acquire(&o.number).await.is_none());
    }

    #[tokio::test]
    async fn acquire_is_exclusive() {
        let (registry, _jobs, _trigger, _listener) = setup(4);
        let o = order("49927398716");
        registry.insert(o.clone()).await.unwrap();
        let registry = Arc::new(registry);

        let guard = registry.acquire(&o.number).await.unwrap();
        let contender = {
            let registry = Arc::clone(&registry);
            let number = o.number.clone();
            tokio::spawn(async move { registry.get(&number).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        assert!(contender.await.unwrap().is_some());
    }

    #[tokio::test]
    async fn load_tracks_everything_and_backlogs_the_overflow() {
        let (registry, _jobs, _trigger, _listener) = setup(1);
        let mut done = order("4561261212345467");
        done.status = OrderStatus::Processed;

        let (report, backlog) =
            registry.load(vec![order("49927398716"), order("79927398713"), done]);
        assert_eq!(
            report,
            LoadReport {
                registered: 2,
                deferred: 1
            }
        );
        assert_eq!(backlog, vec![OrderNumber::parse("79927398713").unwrap()]);
        assert!(registry.contains(&OrderNumber::parse("79927398713").unwrap()));
        assert!(!registry.contains(&OrderNumber::parse("4561261212345467").unwrap()));
    }

    #[tokio::test]
    async fn backlog_is_fed_as_workers_take_jobs() {
        let (registry, jobs, _trigger, mut listener) = setup(1);
        let numbers = ["49927398716", "79927398713", "4561261212345467"];

        let (report, backlog) = registry.load(numbers.iter().map(|n| order(n)));
        assert_eq!(report.deferred, 2);
        let feeder = registry.spawn_backlog(backlog).unwrap();

        for expected in numbers {
            let next = tokio::time::timeout(Duration::from_secs(1), jobs.next(&mut listener))
                .await
                .unwrap();
            assert_eq!(next, Some(OrderNumber::parse(expected).unwrap()));
        }
        tokio::time::timeout(Duration::from_secs(1), feeder)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn backlog_feeder_stops_on_shutdown() {
        let (registry, _jobs, trigger, _listener) = setup(1);
        let (_, backlog) = registry.load(vec![order("49927398716"), order("79927398713")]);
        let feeder = registry.spawn_backlog(backlog).unwrap();

        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), feeder)
            .await
            .unwrap()
            .unwrap();
    }
}
