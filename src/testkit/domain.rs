//! Builders for domain primitives used across tests.

use crate::domain::{Login, Order, OrderNumber};

/// Append the mod-10 check digit to a digit string.
///
/// # Panics
/// If `payload` contains anything but ASCII digits.
pub fn with_check_digit(payload: &str) -> String {
    let mut sum = 0u32;
    for (i, ch) in payload.chars().rev().enumerate() {
        let mut d = ch.to_digit(10).expect("payload must be digits");
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    format!("{payload}{}", (10 - sum % 10) % 10)
}

/// The `n`-th valid order number of a deterministic sequence.
pub fn order_number(n: u64) -> OrderNumber {
    OrderNumber::parse(with_check_digit(&format!("{:010}", 1_000_000 + n)))
        .expect("generated number carries a valid check digit")
}

/// Parse a login, panicking on invalid input.
pub fn login(s: &str) -> Login {
    Login::parse(s).expect("test login must be valid")
}

/// A fresh NEW order.
pub fn new_order(number: &str, owner: &str) -> Order {
    Order::new(
        OrderNumber::parse(number).expect("test order number must be valid"),
        login(owner),
    )
}
