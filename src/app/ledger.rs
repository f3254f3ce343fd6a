//! Per-user balance ledger.
//!
//! Every balance sits behind its own async mutex. Credits and withdrawals
//! hand back a [`BalanceGuard`] that keeps the lock held, so the caller can
//! persist the new balance together with the order or withdrawal that caused
//! it before any other writer sees the user.

use std::ops::Deref;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{Amount, Balance, DomainError, Login};
use crate::error::AccountError;

/// In-memory authority for user balances.
#[derive(Debug, Default)]
pub struct BalanceLedger {
    balances: DashMap<Login, Arc<Mutex<Balance>>>,
}

/// A mutated balance whose lock is still held.
///
/// Dropping the guard keeps the mutation; [`BalanceGuard::revert`] restores
/// the balance seen before it.
#[derive(Debug)]
pub struct BalanceGuard {
    guard: OwnedMutexGuard<Balance>,
    before: Balance,
}

impl BalanceGuard {
    /// Current value under the lock.
    #[must_use]
    pub fn balance(&self) -> Balance {
        *self.guard
    }

    /// Value before this guard's mutation.
    #[must_use]
    pub fn before(&self) -> Balance {
        self.before
    }

    /// Undo the mutation and release the lock.
    pub fn revert(mut self) {
        *self.guard = self.before;
    }
}

impl Deref for BalanceGuard {
    type Target = Balance;

    fn deref(&self) -> &Balance {
        &self.guard
    }
}

impl BalanceLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ledger's contents with stored balances.
    pub fn load<I>(&self, balances: I) -> usize
    where
        I: IntoIterator<Item = (Login, Balance)>,
    {
        let mut loaded = 0;
        for (login, balance) in balances {
            self.balances.insert(login, Arc::new(Mutex::new(balance)));
            loaded += 1;
        }
        loaded
    }

    /// Exclusive access to a user's balance, created at zero if absent.
    pub async fn lock(&self, login: &Login) -> OwnedMutexGuard<Balance> {
        self.entry(login).lock_owned().await
    }

    /// Add `amount` to the user's spendable balance.
    ///
    /// The returned guard keeps the user locked until it drops.
    ///
    /// # Errors
    /// [`DomainError::BalanceOverflow`] without mutating anything.
    pub async fn credit(&self, login: &Login, amount: Amount) -> Result<BalanceGuard, DomainError> {
        let mut guard = self.lock(login).await;
        let before = *guard;
        guard.credit(amount)?;
        Ok(BalanceGuard { guard, before })
    }

    /// Debit `amount` if the current balance covers it.
    ///
    /// The check and the debit happen under one lock acquisition. The
    /// returned guard keeps the user locked until it drops.
    ///
    /// # Errors
    /// [`AccountError::InsufficientFunds`] without mutating anything.
    pub async fn withdraw(&self, login: &Login, amount: Amount) -> Result<BalanceGuard, AccountError> {
        let mut guard = self.lock(login).await;
        let before = *guard;
        if !guard.try_debit(amount) {
            return Err(AccountError::InsufficientFunds {
                requested: amount,
                available: before.current,
            });
        }
        Ok(BalanceGuard { guard, before })
    }

    /// Current balance, zero for users never credited.
    pub async fn snapshot(&self, login: &Login) -> Balance {
        let entry = self.balances.get(login).map(|e| Arc::clone(e.value()));
        match entry {
            Some(entry) => *entry.lock().await,
            None => Balance::default(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    fn entry(&self, login: &Login) -> Arc<Mutex<Balance>> {
        if let Some(existing) = self.balances.get(login) {
            return Arc::clone(existing.value());
        }
        Arc::clone(self.balances.entry(login.clone()).or_default().value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn login(s: &str) -> Login {
        Login::parse(s).unwrap()
    }

    #[tokio::test]
    async fn credit_creates_missing_balance() {
        let ledger = BalanceLedger::new();
        let guard = ledger.credit(&login("alice"), dec!(500)).await.unwrap();
        assert_eq!(guard.balance(), Balance::new(dec!(500), dec!(0)));
        assert_eq!(guard.before(), Balance::default());
        drop(guard);

        assert_eq!(
            ledger.snapshot(&login("alice")).await,
            Balance::new(dec!(500), dec!(0))
        );
    }

    #[tokio::test]
    async fn overflowing_credit_leaves_balance_alone() {
        let ledger = BalanceLedger::new();
        ledger.load([(login("alice"), Balance::new(rust_decimal::Decimal::MAX, dec!(0)))]);

        let err = ledger.credit(&login("alice"), dec!(1)).await.unwrap_err();
        assert!(matches!(err, DomainError::BalanceOverflow { .. }));
        assert_eq!(
            ledger.snapshot(&login("alice")).await.current,
            rust_decimal::Decimal::MAX
        );
    }

    #[tokio::test]
    async fn snapshot_of_unknown_user_is_zero() {
        let ledger = BalanceLedger::new();
        assert_eq!(ledger.snapshot(&login("ghost")).await, Balance::default());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn insufficient_withdrawal_changes_nothing() {
        let ledger = BalanceLedger::new();
        ledger.load([(login("alice"), Balance::new(dec!(10), dec!(0)))]);

        let err = ledger.withdraw(&login("alice"), dec!(10.01)).await.unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientFunds {
                requested: dec!(10.01),
                available: dec!(10)
            }
        );
        assert_eq!(
            ledger.snapshot(&login("alice")).await,
            Balance::new(dec!(10), dec!(0))
        );
    }

    #[tokio::test]
    async fn revert_restores_previous_balance() {
        let ledger = BalanceLedger::new();
        ledger.load([(login("alice"), Balance::new(dec!(10), dec!(0)))]);

        let guard = ledger.withdraw(&login("alice"), dec!(4)).await.unwrap();
        assert_eq!(*guard, Balance::new(dec!(6), dec!(4)));
        guard.revert();

        assert_eq!(
            ledger.snapshot(&login("alice")).await,
            Balance::new(dec!(10), dec!(0))
        );
    }

    #[tokio::test]
    async fn guard_blocks_other_writers() {
        let ledger = Arc::new(BalanceLedger::new());
        let guard = ledger.credit(&login("alice"), dec!(1)).await.unwrap();

        let other = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.credit(&login("alice"), dec!(2)).await.unwrap().balance() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!other.is_finished());

        drop(guard);
        assert_eq!(other.await.unwrap(), Balance::new(dec!(3), dec!(0)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_withdrawals_never_overdraw() {
        let ledger = Arc::new(BalanceLedger::new());
        let alice = login("alice");
        ledger.load([(alice.clone(), Balance::new(dec!(100), dec!(0)))]);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let alice = alice.clone();
                tokio::spawn(async move {
                    ledger.withdraw(&alice, dec!(10)).await.map(|g| g.balance())
                })
            })
            .collect();

        let mut successes = 0;
        let mut refusals = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(balance) => {
                    assert!(balance.current >= dec!(0));
                    successes += 1;
                }
                Err(AccountError::InsufficientFunds { .. }) => refusals += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 10);
        assert_eq!(refusals, 40);
        assert_eq!(
            ledger.snapshot(&alice).await,
            Balance::new(dec!(0), dec!(100))
        );
    }
}
