//! Accrual service HTTP adapter.
//!
//! Implements [`AccrualSource`](crate::port::AccrualSource) on top of
//! `reqwest`, polling `GET /api/orders/{number}`.

mod client;
mod dto;

pub use client::{interpret_response, AccrualClient};
pub use dto::AccrualResponse;
