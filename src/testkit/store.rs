//! Fault-injecting [`Store`] wrapper for tests.
//!
//! Delegates to an inner store, counts status writes, and can fail a set
//! number of upcoming status or withdrawal writes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::adapter::outbound::MemoryStore;
use crate::domain::{Balance, Login, Order, Withdrawal};
use crate::error::{Error, Result};
use crate::port::{CreateOrder, Store};

/// Wraps a store and injects failures on demand.
pub struct FaultyStore<S = MemoryStore> {
    inner: Arc<S>,
    status_saves: AtomicUsize,
    fail_status_saves: AtomicUsize,
    fail_withdrawal_saves: AtomicUsize,
}

impl FaultyStore<MemoryStore> {
    /// Wrap a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

impl<S: Store> FaultyStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            status_saves: AtomicUsize::new(0),
            fail_status_saves: AtomicUsize::new(0),
            fail_withdrawal_saves: AtomicUsize::new(0),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Fail the next `n` calls to `save_order_status`.
    pub fn fail_status_saves(&self, n: usize) {
        self.fail_status_saves.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` calls to `save_withdrawal`.
    pub fn fail_withdrawal_saves(&self, n: usize) {
        self.fail_withdrawal_saves.store(n, Ordering::SeqCst);
    }

    /// Successful `save_order_status` calls so far.
    pub fn status_saves(&self) -> usize {
        self.status_saves.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<S: Store> Store for FaultyStore<S> {
    async fn create_user(&self, login: &Login) -> Result<bool> {
        self.inner.create_user(login).await
    }

    async fn user_exists(&self, login: &Login) -> Result<bool> {
        self.inner.user_exists(login).await
    }

    async fn create_order(&self, order: &Order) -> Result<CreateOrder> {
        self.inner.create_order(order).await
    }

    async fn discard_order(&self, order: &Order) -> Result<bool> {
        self.inner.discard_order(order).await
    }

    async fn orders_by_user(&self, login: &Login) -> Result<Vec<Order>> {
        self.inner.orders_by_user(login).await
    }

    async fn balance(&self, login: &Login) -> Result<Option<Balance>> {
        self.inner.balance(login).await
    }

    async fn save_balance(&self, login: &Login, balance: &Balance) -> Result<()> {
        self.inner.save_balance(login, balance).await
    }

    async fn save_order_status(&self, order: &Order, balance: Option<&Balance>) -> Result<()> {
        if Self::take_failure(&self.fail_status_saves) {
            return Err(Error::Database("injected status write failure".into()));
        }
        self.inner.save_order_status(order, balance).await?;
        self.status_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save_withdrawal(
        &self,
        login: &Login,
        withdrawal: &Withdrawal,
        balance: &Balance,
    ) -> Result<bool> {
        if Self::take_failure(&self.fail_withdrawal_saves) {
            return Err(Error::Database("injected withdrawal write failure".into()));
        }
        self.inner.save_withdrawal(login, withdrawal, balance).await
    }

    async fn withdrawals_by_user(&self, login: &Login) -> Result<Vec<Withdrawal>> {
        self.inner.withdrawals_by_user(login).await
    }

    async fn pending_orders(&self) -> Result<Vec<Order>> {
        self.inner.pending_orders().await
    }

    async fn all_balances(&self) -> Result<Vec<(Login, Balance)>> {
        self.inner.all_balances().await
    }
}
