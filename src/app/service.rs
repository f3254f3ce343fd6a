//! Loyalty account operations exposed to the request layer.
//!
//! Inputs arrive as raw strings and are validated here, before anything
//! reaches the registry, the ledger or the store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::ledger::BalanceLedger;
use super::registry::OrderRegistry;
use crate::domain::money::ensure_positive;
use crate::domain::{Amount, Balance, Login, Order, OrderNumber, Withdrawal};
use crate::error::{AccountError, Result};
use crate::port::{CreateOrder, Store};

/// Result of submitting an order number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// New order, now being polled.
    Accepted,
    /// The same user already uploaded this number.
    AlreadyUploaded,
}

/// Facade over the engine for account-level operations.
#[derive(Clone)]
pub struct LoyaltyService {
    store: Arc<dyn Store>,
    registry: Arc<OrderRegistry>,
    ledger: Arc<BalanceLedger>,
}

impl LoyaltyService {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<OrderRegistry>,
        ledger: Arc<BalanceLedger>,
    ) -> Self {
        Self {
            store,
            registry,
            ledger,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    /// [`crate::domain::DomainError::InvalidLogin`] or
    /// [`AccountError::UserExists`].
    pub async fn register_user(&self, login: &str) -> Result<Login> {
        let login = Login::parse(login)?;
        if !self.store.create_user(&login).await? {
            return Err(AccountError::UserExists {
                login: login.to_string(),
            }
            .into());
        }
        info!(user = %login, "User registered");
        Ok(login)
    }

    /// Upload an order number for accrual.
    ///
    /// # Errors
    /// Validation errors, [`AccountError::UnknownUser`],
    /// [`AccountError::OrderConflict`], or a dispatch error when the poll
    /// queue cannot take the order.
    pub async fn submit_order(&self, login: &str, number: &str) -> Result<Submission> {
        let login = self.known_user(login).await?;
        let number = OrderNumber::parse(number.trim())?;
        let order = Order::new(number, login);

        match self.store.create_order(&order).await? {
            CreateOrder::Created => {
                if let Err(e) = self.registry.insert(order.clone()).await {
                    // Nothing polls the order, so it must not stay stored either.
                    self.withdraw_submission(&order).await;
                    return Err(e.into());
                }
                info!(order = %order.number, "Order accepted");
                Ok(Submission::Accepted)
            }
            CreateOrder::AlreadyExists => Ok(Submission::AlreadyUploaded),
            CreateOrder::Conflict => Err(AccountError::OrderConflict {
                number: order.number.to_string(),
            }
            .into()),
        }
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    /// [`AccountError::UnknownUser`] or a store error.
    pub async fn orders(&self, login: &str) -> Result<Vec<Order>> {
        let login = self.known_user(login).await?;
        self.store.orders_by_user(&login).await
    }

    /// A user's current balance.
    ///
    /// # Errors
    /// [`AccountError::UnknownUser`] or a store error.
    pub async fn balance(&self, login: &str) -> Result<Balance> {
        let login = self.known_user(login).await?;
        Ok(self.ledger.snapshot(&login).await)
    }

    /// Spend `sum` points against the order reference `number`.
    ///
    /// The sufficiency check, the debit and the write all happen while the
    /// user's balance is locked. A refused or failed write restores the
    /// balance.
    ///
    /// # Errors
    /// Validation errors, [`AccountError::UnknownUser`],
    /// [`AccountError::InsufficientFunds`],
    /// [`AccountError::DuplicateWithdrawal`], or a store error.
    pub async fn withdraw(&self, login: &str, number: &str, sum: Amount) -> Result<Withdrawal> {
        let login = self.known_user(login).await?;
        let number = OrderNumber::parse(number.trim())?;
        let sum = ensure_positive(sum)?;

        let guard = self.ledger.withdraw(&login, sum).await?;
        let withdrawal = Withdrawal {
            order: number,
            sum,
            processed_at: Utc::now(),
        };

        match self
            .store
            .save_withdrawal(&login, &withdrawal, &guard.balance())
            .await
        {
            Ok(true) => {
                info!(user = %login, order = %withdrawal.order, sum = %sum, "Withdrawal committed");
                Ok(withdrawal)
            }
            Ok(false) => {
                guard.revert();
                Err(AccountError::DuplicateWithdrawal {
                    number: withdrawal.order.to_string(),
                }
                .into())
            }
            Err(e) => {
                guard.revert();
                warn!(user = %login, order = %withdrawal.order, error = %e, "Withdrawal write failed");
                Err(e)
            }
        }
    }

    /// A user's withdrawals, newest first.
    ///
    /// # Errors
    /// [`AccountError::UnknownUser`] or a store error.
    pub async fn withdrawals(&self, login: &str) -> Result<Vec<Withdrawal>> {
        let login = self.known_user(login).await?;
        self.store.withdrawals_by_user(&login).await
    }

    async fn withdraw_submission(&self, order: &Order) {
        match self.store.discard_order(order).await {
            Ok(_) => debug!(order = %order.number, "Submission rolled back"),
            // Still NEW in storage; startup recovery picks it up.
            Err(e) => warn!(order = %order.number, error = %e, "Failed to roll back submission"),
        }
    }

    async fn known_user(&self, login: &str) -> Result<Login> {
        let login = Login::parse(login)?;
        if !self.store.user_exists(&login).await? {
            return Err(AccountError::UnknownUser {
                login: login.to_string(),
            }
            .into());
        }
        Ok(login)
    }
}
