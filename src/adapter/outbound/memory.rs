//! In-memory store implementation.
//!
//! All tables sit behind one lock, so the combined writes are atomic the same
//! way a database transaction is.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{Balance, Login, Order, OrderNumber, OrderStatus, Withdrawal};
use crate::error::{Error, Result};
use crate::port::{CreateOrder, Store};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Login, DateTime<Utc>>,
    orders: HashMap<OrderNumber, Order>,
    balances: HashMap<Login, Balance>,
    withdrawals: HashMap<OrderNumber, (Login, Withdrawal)>,
}

/// In-memory [`Store`] for tests and `run --in-memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders, terminal or not.
    pub fn order_count(&self) -> usize {
        self.tables.read().orders.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, login: &Login) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(login) {
            return Ok(false);
        }
        tables.users.insert(login.clone(), Utc::now());
        Ok(true)
    }

    async fn user_exists(&self, login: &Login) -> Result<bool> {
        Ok(self.tables.read().users.contains_key(login))
    }

    async fn create_order(&self, order: &Order) -> Result<CreateOrder> {
        let mut tables = self.tables.write();
        match tables.orders.get(&order.number) {
            Some(existing) if existing.owner == order.owner => Ok(CreateOrder::AlreadyExists),
            Some(_) => Ok(CreateOrder::Conflict),
            None => {
                tables.orders.insert(order.number.clone(), order.clone());
                Ok(CreateOrder::Created)
            }
        }
    }

    async fn discard_order(&self, order: &Order) -> Result<bool> {
        let mut tables = self.tables.write();
        let removable = tables
            .orders
            .get(&order.number)
            .is_some_and(|o| o.owner == order.owner && o.status == OrderStatus::New);
        if removable {
            tables.orders.remove(&order.number);
        }
        Ok(removable)
    }

    async fn orders_by_user(&self, login: &Login) -> Result<Vec<Order>> {
        let tables = self.tables.read();
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| &o.owner == login)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(orders)
    }

    async fn balance(&self, login: &Login) -> Result<Option<Balance>> {
        Ok(self.tables.read().balances.get(login).copied())
    }

    async fn save_balance(&self, login: &Login, balance: &Balance) -> Result<()> {
        self.tables.write().balances.insert(login.clone(), *balance);
        Ok(())
    }

    async fn save_order_status(&self, order: &Order, balance: Option<&Balance>) -> Result<()> {
        let mut tables = self.tables.write();
        let Some(stored) = tables.orders.get_mut(&order.number) else {
            return Err(Error::Database(format!("order {} not found", order.number)));
        };
        stored.status = order.status;
        stored.accrual = order.accrual;
        if let Some(balance) = balance {
            tables.balances.insert(order.owner.clone(), *balance);
        }
        Ok(())
    }

    async fn save_withdrawal(
        &self,
        login: &Login,
        withdrawal: &Withdrawal,
        balance: &Balance,
    ) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.withdrawals.contains_key(&withdrawal.order) {
            return Ok(false);
        }
        tables
            .withdrawals
            .insert(withdrawal.order.clone(), (login.clone(), withdrawal.clone()));
        tables.balances.insert(login.clone(), *balance);
        Ok(true)
    }

    async fn withdrawals_by_user(&self, login: &Login) -> Result<Vec<Withdrawal>> {
        let tables = self.tables.read();
        let mut withdrawals: Vec<Withdrawal> = tables
            .withdrawals
            .values()
            .filter(|(owner, _)| owner == login)
            .map(|(_, w)| w.clone())
            .collect();
        withdrawals.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(withdrawals)
    }

    async fn pending_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read();
        let mut pending: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(pending)
    }

    async fn all_balances(&self) -> Result<Vec<(Login, Balance)>> {
        Ok(self
            .tables
            .read()
            .balances
            .iter()
            .map(|(login, balance)| (login.clone(), *balance))
            .collect())
    }
}
