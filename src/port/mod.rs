//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the reconciliation engine and the systems it
//! treats as external collaborators:
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │   Reconciliation Engine │
//!                    └────────────┬────────────┘
//!                 ┌───────────────┴───────────────┐
//!                 ▼                               ▼
//!         ┌───────────────┐               ┌──────────────┐
//!         │ AccrualSource │               │    Store     │
//!         │ (HTTP client) │               │ (SQLite/mem) │
//!         └───────────────┘               └──────────────┘
//! ```
//!
//! - [`AccrualSource`] - Per-order status lookups at the accrual service
//! - [`Store`] - Transactional persistence of users, orders, balances, withdrawals

mod accrual;
mod store;

pub use accrual::AccrualSource;
pub use store::{CreateOrder, Store};
