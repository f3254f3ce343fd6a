//! Loyalty - order accrual reconciliation engine.
//!
//! Tracks loyalty-bearing orders, polls an external accrual service for
//! each one until it reaches a terminal status, and applies the resulting
//! credits to per-user balances exactly once.
//!
//! # Architecture
//!
//! Order submission registers the order and enqueues its number. A pool of
//! poll workers takes numbers from the bounded queue and asks the accrual
//! service about each order until it is finished. Observed statuses are
//! routed to reconciliation lanes by order number; a lane merges the status
//! into the tracked order, credits the owner when the order is processed,
//! and persists both in one write.
//!
//! # Modules
//!
//! - [`domain`] - Order numbers, logins, statuses, orders and balances
//! - [`port`] - Traits at the storage and accrual-service seams
//! - [`adapter`] - SQLite and in-memory stores, the HTTP accrual client
//! - [`app`] - Job queue, worker pools, registry, ledger, recovery, engine
//! - [`cli`] - Command-line interface
//! - [`error`] - Error types for the crate

pub mod adapter;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
