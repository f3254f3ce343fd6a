//! Scripted [`AccrualSource`] for tests.
//!
//! Each order number gets a list of steps. Every fetch consumes one step;
//! the last step repeats forever once reached. Orders without a script
//! answer with the default step, `NotRegistered` unless changed.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{AccrualStatus, Amount, DomainError, OrderNumber, StatusReport};
use crate::error::AccrualError;
use crate::port::AccrualSource;

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// `200 OK` with this status and optional accrual.
    Status(AccrualStatus, Option<Amount>),
    /// `204 No Content`.
    NotRegistered,
    /// `429 Too Many Requests`.
    RateLimited,
    /// Any other HTTP status.
    HttpStatus(u16),
    /// `200 OK` carrying a status outside the known vocabulary.
    UnknownStatus(String),
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<ScriptStep>,
    calls: usize,
}

/// An accrual source that replays per-order scripts.
#[derive(Debug)]
pub struct ScriptedAccrualSource {
    scripts: Mutex<HashMap<OrderNumber, Script>>,
    fallback: ScriptStep,
    latency: Duration,
}

impl Default for ScriptedAccrualSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAccrualSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: ScriptStep::NotRegistered,
            latency: Duration::ZERO,
        }
    }

    /// Script the replies for one order.
    ///
    /// # Panics
    /// If `number` fails the checksum.
    pub fn script(self, number: &str, steps: Vec<ScriptStep>) -> Self {
        self.set_script(number, steps);
        self
    }

    /// Replace an order's script on a shared source.
    ///
    /// # Panics
    /// If `number` fails the checksum.
    pub fn set_script(&self, number: &str, steps: Vec<ScriptStep>) {
        let number = OrderNumber::parse(number).expect("scripted order number must be valid");
        self.scripts.lock().insert(
            number,
            Script {
                steps: steps.into(),
                calls: 0,
            },
        );
    }

    /// Reply for orders without a script.
    pub fn with_fallback(mut self, step: ScriptStep) -> Self {
        self.fallback = step;
        self
    }

    /// Delay every reply.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// How many times `number` was fetched.
    pub fn calls(&self, number: &OrderNumber) -> usize {
        self.scripts.lock().get(number).map_or(0, |s| s.calls)
    }

    /// Total fetches across all orders.
    pub fn total_calls(&self) -> usize {
        self.scripts.lock().values().map(|s| s.calls).sum()
    }

    fn next_step(&self, number: &OrderNumber) -> ScriptStep {
        let mut scripts = self.scripts.lock();
        let script = scripts.entry(number.clone()).or_default();
        script.calls += 1;
        if script.steps.len() > 1 {
            script.steps.pop_front().unwrap_or_else(|| self.fallback.clone())
        } else {
            script.steps.front().cloned().unwrap_or_else(|| self.fallback.clone())
        }
    }
}

#[async_trait]
impl AccrualSource for ScriptedAccrualSource {
    async fn fetch(&self, number: &OrderNumber) -> Result<StatusReport, AccrualError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.next_step(number) {
            ScriptStep::Status(status, accrual) => Ok(StatusReport {
                number: number.clone(),
                status,
                accrual,
            }),
            ScriptStep::NotRegistered => Err(AccrualError::NotRegistered {
                number: number.to_string(),
            }),
            ScriptStep::RateLimited => Err(AccrualError::RateLimited {
                retry_after_secs: Some(60),
            }),
            ScriptStep::HttpStatus(status) => Err(AccrualError::UnexpectedStatus { status }),
            ScriptStep::UnknownStatus(status) => {
                Err(AccrualError::Domain(DomainError::UnknownAccrualStatus { status }))
            }
        }
    }
}
