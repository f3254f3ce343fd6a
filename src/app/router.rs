//! Routes polled status reports to reconciliation lanes.
//!
//! A lane is chosen by hashing the order number, so every report for one
//! order is applied by the same lane in the order it was published.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::shutdown::Shutdown;
use crate::domain::{OrderNumber, StatusReport};
use crate::error::DispatchError;

/// Publisher handle shared by all poll workers.
#[derive(Debug, Clone)]
pub struct ResultRouter {
    lanes: Arc<[mpsc::Sender<StatusReport>]>,
}

impl ResultRouter {
    /// Create `lanes` bounded channels of `capacity` each.
    ///
    /// Returns the router and one receiver per lane. `lanes` is clamped to
    /// at least one.
    #[must_use]
    pub fn new(lanes: usize, capacity: usize) -> (Self, Vec<mpsc::Receiver<StatusReport>>) {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..lanes.max(1)).map(|_| mpsc::channel(capacity)).unzip();
        (
            Self {
                lanes: senders.into(),
            },
            receivers,
        )
    }

    /// Number of lanes.
    #[must_use]
    pub fn lanes(&self) -> usize {
        self.lanes.len()
    }

    /// Lane index responsible for `number`.
    #[must_use]
    pub fn lane_for(&self, number: &OrderNumber) -> usize {
        let mut hasher = DefaultHasher::new();
        number.hash(&mut hasher);
        (hasher.finish() % self.lanes.len() as u64) as usize
    }

    /// Hand a report to its lane, waiting for space.
    ///
    /// # Errors
    /// [`DispatchError::ShuttingDown`] if shutdown fires first or the lane's
    /// consumer is gone.
    pub async fn publish(
        &self,
        report: StatusReport,
        shutdown: &mut Shutdown,
    ) -> Result<(), DispatchError> {
        let lane = &self.lanes[self.lane_for(&report.number)];
        tokio::select! {
            biased;
            () = shutdown.wait() => Err(DispatchError::ShuttingDown),
            sent = lane.send(report) => sent.map_err(|_| DispatchError::ShuttingDown),
        }
    }
}
