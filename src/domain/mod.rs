//! Storage- and transport-agnostic domain types.
//!
//! - [`id`] - Validated identifiers: [`OrderNumber`] and [`Login`]
//! - [`status`] - Internal and external status vocabularies plus the normalizer
//! - [`order`] - Tracked orders and polled status reports
//! - [`balance`] - Per-user balances and withdrawals
//! - [`error`] - Validation errors raised by constructors

pub mod balance;
pub mod error;
pub mod id;
pub mod money;
pub mod order;
pub mod status;

pub use balance::{Balance, Withdrawal};
pub use error::DomainError;
pub use id::{luhn_valid, Login, OrderNumber};
pub use money::Amount;
pub use order::{Order, StatusReport, Transition};
pub use status::{AccrualStatus, OrderStatus};
