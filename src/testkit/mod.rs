//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`accrual`] - [`ScriptedAccrualSource`](accrual::ScriptedAccrualSource),
//!   replaying per-order accrual replies.
//! - [`store`] - [`FaultyStore`](store::FaultyStore), a store wrapper that
//!   counts and fails writes on demand.
//! - [`domain`] - Builders for order numbers, logins and orders.

pub mod accrual;
pub mod domain;
pub mod store;
