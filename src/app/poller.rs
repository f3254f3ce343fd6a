//! Poll worker pool.
//!
//! Each worker takes one order number at a time from the job queue and asks
//! the accrual service about it until the order reaches a terminal status.
//! Only the first observation and the terminal one are published; repeats of
//! a non-terminal status are dropped at the source.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::queue::JobReceiver;
use super::router::ResultRouter;
use super::shutdown::Shutdown;
use crate::domain::{AccrualStatus, OrderNumber};
use crate::error::AccrualError;
use crate::port::AccrualSource;

/// How tracking of one order ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A terminal status was observed and published.
    Finished,
    /// A fatal error stopped polling this order; the worker moves on.
    Abandoned,
    /// Shutdown fired; nothing further was published.
    Cancelled,
}

/// One member of the poll worker pool.
pub struct PollWorker {
    id: usize,
    source: Arc<dyn AccrualSource>,
    jobs: JobReceiver,
    router: ResultRouter,
    interval: Duration,
    shutdown: Shutdown,
}

impl PollWorker {
    #[must_use]
    pub fn new(
        id: usize,
        source: Arc<dyn AccrualSource>,
        jobs: JobReceiver,
        router: ResultRouter,
        interval: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            id,
            source,
            jobs,
            router,
            interval,
            shutdown,
        }
    }

    /// Spawn the worker onto the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Take jobs until the queue closes or shutdown fires.
    pub async fn run(mut self) {
        debug!(worker = self.id, "Poll worker started");
        loop {
            let mut shutdown = self.shutdown.clone();
            let Some(number) = self.jobs.next(&mut shutdown).await else {
                break;
            };
            if self.track(&number).await == PollOutcome::Cancelled {
                break;
            }
        }
        debug!(worker = self.id, "Poll worker stopped");
    }

    /// Poll one order until it is finished, abandoned or cancelled.
    pub async fn track(&mut self, number: &OrderNumber) -> PollOutcome {
        let mut seen: Option<AccrualStatus> = None;

        loop {
            if self.shutdown.is_triggered() {
                return PollOutcome::Cancelled;
            }

            let fetched = tokio::select! {
                biased;
                () = self.shutdown.wait() => return PollOutcome::Cancelled,
                fetched = self.source.fetch(number) => fetched,
            };

            match fetched {
                Ok(report) => {
                    let status = report.status;
                    let terminal = status.is_terminal();
                    if seen.is_none() || terminal {
                        debug!(worker = self.id, order = %number, %status, "Publishing status");
                        if self.router.publish(report, &mut self.shutdown).await.is_err() {
                            return PollOutcome::Cancelled;
                        }
                    }
                    if terminal {
                        info!(worker = self.id, order = %number, %status, "Order reached terminal status");
                        return PollOutcome::Finished;
                    }
                    seen = Some(status);
                }
                Err(e) if e.is_transient() => log_transient(self.id, number, &e),
                Err(e) => {
                    error!(worker = self.id, order = %number, error = %e, "Abandoning order");
                    return PollOutcome::Abandoned;
                }
            }

            tokio::select! {
                biased;
                () = self.shutdown.wait() => return PollOutcome::Cancelled,
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

fn log_transient(worker: usize, number: &OrderNumber, e: &AccrualError) {
    match e {
        AccrualError::NotRegistered { .. } => {
            debug!(worker, order = %number, "Order not registered yet");
        }
        AccrualError::RateLimited { retry_after_secs } => {
            warn!(worker, order = %number, retry_after_secs = ?retry_after_secs, "Rate limited");
        }
        _ => warn!(worker, order = %number, error = %e, "Poll failed, retrying"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::queue::JobQueue;
    use crate::app::shutdown::{self, ShutdownTrigger};
    use crate::domain::StatusReport;
    use crate::testkit::accrual::{ScriptStep, ScriptedAccrualSource};
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    const ORDER: &str = "49927398716";

    fn number() -> OrderNumber {
        OrderNumber::parse(ORDER).unwrap()
    }

    fn worker(
        source: Arc<ScriptedAccrualSource>,
    ) -> (PollWorker, mpsc::Receiver<StatusReport>, ShutdownTrigger) {
        let (trigger, listener) = shutdown::channel();
        let (_queue, jobs) = JobQueue::new(4, Duration::from_millis(20), listener.clone());
        let (router, mut lanes) = ResultRouter::new(1, 16);
        let worker = PollWorker::new(
            0,
            source,
            jobs,
            router,
            Duration::from_millis(1),
            listener,
        );
        (worker, lanes.remove(0), trigger)
    }

    fn drain(rx: &mut mpsc::Receiver<StatusReport>) -> Vec<AccrualStatus> {
        let mut out = Vec::new();
        while let Ok(report) = rx.try_recv() {
            out.push(report.status);
        }
        out
    }

    #[tokio::test]
    async fn publishes_first_and_terminal_only() {
        let source = Arc::new(ScriptedAccrualSource::new().script(
            ORDER,
            vec![
                ScriptStep::Status(AccrualStatus::Registered, None),
                ScriptStep::Status(AccrualStatus::Processing, None),
                ScriptStep::Status(AccrualStatus::Processing, None),
                ScriptStep::Status(AccrualStatus::Processed, Some(dec!(500))),
            ],
        ));
        let (mut worker, mut rx, _trigger) = worker(Arc::clone(&source));

        assert_eq!(worker.track(&number()).await, PollOutcome::Finished);
        assert_eq!(
            drain(&mut rx),
            vec![AccrualStatus::Registered, AccrualStatus::Processed]
        );
        assert_eq!(source.calls(&number()), 4);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_silently() {
        let source = Arc::new(ScriptedAccrualSource::new().script(
            ORDER,
            vec![
                ScriptStep::NotRegistered,
                ScriptStep::RateLimited,
                ScriptStep::HttpStatus(500),
                ScriptStep::Status(AccrualStatus::Invalid, None),
            ],
        ));
        let (mut worker, mut rx, _trigger) = worker(Arc::clone(&source));

        assert_eq!(worker.track(&number()).await, PollOutcome::Finished);
        assert_eq!(drain(&mut rx), vec![AccrualStatus::Invalid]);
        assert_eq!(source.calls(&number()), 4);
    }

    #[tokio::test]
    async fn unknown_status_abandons_the_order() {
        let source = Arc::new(
            ScriptedAccrualSource::new().script(ORDER, vec![ScriptStep::UnknownStatus("LOST".into())]),
        );
        let (mut worker, mut rx, _trigger) = worker(source);

        assert_eq!(worker.track(&number()).await, PollOutcome::Abandoned);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn shutdown_cancels_without_publishing() {
        let source = Arc::new(
            ScriptedAccrualSource::new().script(ORDER, vec![ScriptStep::NotRegistered]),
        );
        let (mut worker, mut rx, trigger) = worker(source);
        trigger.trigger();

        assert_eq!(worker.track(&number()).await, PollOutcome::Cancelled);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn shutdown_interrupts_the_poll_wait() {
        let source = Arc::new(
            ScriptedAccrualSource::new().script(ORDER, vec![ScriptStep::NotRegistered]),
        );
        let (mut worker, _rx, trigger) = worker(source);
        worker.interval = Duration::from_secs(60);

        let tracking = tokio::spawn(async move { worker.track(&number()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.trigger();

        let outcome = tokio::time::timeout(Duration::from_secs(1), tracking)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, PollOutcome::Cancelled);
    }
}
