//! Store port for persistence operations.
//!
//! This is the persistence gateway the engine relies on. Methods that must
//! commit together (order status with balance, withdrawal with balance) are
//! single calls so that implementations can wrap them in one transaction.

use async_trait::async_trait;

use crate::domain::{Balance, Login, Order, Withdrawal};
use crate::error::Result;

/// Outcome of registering a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOrder {
    /// First time this number was seen.
    Created,
    /// The same user already uploaded this number.
    AlreadyExists,
    /// The number belongs to a different user.
    Conflict,
}

/// Storage operations for the loyalty engine.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - `save_order_status` and `save_withdrawal` must be atomic: either every
///   row they touch is written or none is
/// - `pending_orders` returns every order whose status is not terminal
#[async_trait]
pub trait Store: Send + Sync {
    /// Register a user. Returns `false` if the login is taken.
    async fn create_user(&self, login: &Login) -> Result<bool>;

    /// Whether a user is registered.
    async fn user_exists(&self, login: &Login) -> Result<bool>;

    /// Record a submitted order, distinguishing duplicates from conflicts.
    async fn create_order(&self, order: &Order) -> Result<CreateOrder>;

    /// Remove an order that was created but never handed to a poller.
    ///
    /// Only deletes when the stored order still belongs to `order.owner` and
    /// is still NEW. Returns whether a row was removed.
    async fn discard_order(&self, order: &Order) -> Result<bool>;

    /// All orders uploaded by a user, newest first.
    async fn orders_by_user(&self, login: &Login) -> Result<Vec<Order>>;

    /// A user's stored balance, if any credit or withdrawal ever happened.
    async fn balance(&self, login: &Login) -> Result<Option<Balance>>;

    /// Upsert a user's balance row.
    async fn save_balance(&self, login: &Login, balance: &Balance) -> Result<()>;

    /// Write the order's status and accrual, plus the owner's balance when
    /// given, in one transaction.
    async fn save_order_status(&self, order: &Order, balance: Option<&Balance>) -> Result<()>;

    /// Write a withdrawal and the resulting balance in one transaction.
    ///
    /// Returns `false` without writing anything if the withdrawal reference
    /// was already used.
    async fn save_withdrawal(
        &self,
        login: &Login,
        withdrawal: &Withdrawal,
        balance: &Balance,
    ) -> Result<bool>;

    /// A user's withdrawals, newest first.
    async fn withdrawals_by_user(&self, login: &Login) -> Result<Vec<Withdrawal>>;

    /// Every order not yet in a terminal status.
    async fn pending_orders(&self) -> Result<Vec<Order>>;

    /// Every stored balance.
    async fn all_balances(&self) -> Result<Vec<(Login, Balance)>>;
}
