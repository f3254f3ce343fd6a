//! Bounded job queue feeding the poll worker pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use super::shutdown::Shutdown;
use crate::domain::OrderNumber;
use crate::error::DispatchError;

/// Producer side of the job queue.
///
/// Cloned into the registry; every clone feeds the same bounded buffer.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<OrderNumber>,
    submit_timeout: Duration,
    shutdown: Shutdown,
}

/// Consumer side shared by all poll workers.
#[derive(Debug, Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<OrderNumber>>>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` waiting order numbers.
    #[must_use]
    pub fn new(capacity: usize, submit_timeout: Duration, shutdown: Shutdown) -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                submit_timeout,
                shutdown,
            },
            JobReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Enqueue an order number for polling.
    ///
    /// Waits up to the submit timeout for space.
    ///
    /// # Errors
    /// [`DispatchError::QueueFull`] when the wait times out,
    /// [`DispatchError::ShuttingDown`] when shutdown fires first or every
    /// worker is gone.
    pub async fn submit(&self, number: OrderNumber) -> Result<(), DispatchError> {
        if self.shutdown.is_triggered() {
            return Err(DispatchError::ShuttingDown);
        }

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            biased;
            () = shutdown.wait() => Err(DispatchError::ShuttingDown),
            sent = tokio::time::timeout(self.submit_timeout, self.tx.send(number)) => match sent {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(DispatchError::ShuttingDown),
                Err(_) => Err(DispatchError::QueueFull),
            },
        }
    }

    /// Enqueue only if there is room right now.
    ///
    /// # Errors
    /// [`DispatchError::QueueFull`] when the buffer is full,
    /// [`DispatchError::ShuttingDown`] after shutdown or once every worker is
    /// gone.
    pub fn try_submit(&self, number: OrderNumber) -> Result<(), DispatchError> {
        if self.shutdown.is_triggered() {
            return Err(DispatchError::ShuttingDown);
        }
        match self.tx.try_send(number) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(DispatchError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::ShuttingDown),
        }
    }

    /// Enqueue, waiting for space as long as it takes.
    ///
    /// # Errors
    /// [`DispatchError::ShuttingDown`] if shutdown fires first or every
    /// worker is gone.
    pub async fn submit_waiting(&self, number: OrderNumber) -> Result<(), DispatchError> {
        let mut shutdown = self.shutdown.clone();
        if shutdown.is_triggered() {
            return Err(DispatchError::ShuttingDown);
        }
        tokio::select! {
            biased;
            () = shutdown.wait() => Err(DispatchError::ShuttingDown),
            sent = self.tx.send(number) => sent.map_err(|_| DispatchError::ShuttingDown),
        }
    }

    /// Order numbers currently waiting for a worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl JobReceiver {
    /// Take the next order number, or `None` once shutdown fires or every
    /// producer is gone.
    pub async fn next(&self, shutdown: &mut Shutdown) -> Option<OrderNumber> {
        let mut rx = tokio::select! {
            biased;
            () = shutdown.wait() => return None,
            guard = self.rx.lock() => guard,
        };
        let job = tokio::select! {
            biased;
            () = shutdown.wait() => None,
            job = rx.recv() => job,
        };
        if let Some(number) = &job {
            debug!(order = %number, "Dequeued order for polling");
        }
        job
    }
}
