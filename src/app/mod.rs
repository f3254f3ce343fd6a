//! Application layer - the reconciliation engine and its configuration.
//!
//! - [`queue`] / [`poller`] - bounded job queue and the poll worker pool
//! - [`router`] / [`reconciler`] - per-order result lanes and the
//!   reconciliation coordinator
//! - [`registry`] / [`ledger`] - in-memory authority for active orders and
//!   balances
//! - [`recovery`] - startup reload of persisted state
//! - [`service`] - account operations for the request layer
//! - [`engine`] - wiring and lifecycle

pub mod config;
pub mod engine;
pub mod ledger;
pub mod poller;
pub mod queue;
pub mod reconciler;
pub mod recovery;
pub mod registry;
pub mod router;
pub mod service;
pub mod shutdown;

pub use config::{Config, EngineSettings, LogFormat, LoggingConfig, Overrides};
pub use engine::Engine;
pub use ledger::{BalanceGuard, BalanceLedger};
pub use registry::{LoadReport, OrderRegistry};
pub use service::{LoyaltyService, Submission};
