//! SQLite persistence gateway.
//!
//! Every call checks a connection out of the pool on a blocking thread.
//! Writes that must land together run inside one diesel transaction.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::{
    BalanceRow, OrderRow, UserRow, WithdrawalRow,
};
use crate::adapter::outbound::sqlite::database::schema::{balances, orders, users, withdrawals};
use crate::domain::{Balance, Login, Order, OrderNumber, OrderStatus, Withdrawal};
use crate::error::{Error, Result};
use crate::port::{CreateOrder, Store};

/// SQLite-backed [`Store`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Wrap an already-migrated connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| Error::Database(e.to_string()))?
    }

    fn order_row(order: &Order) -> OrderRow {
        OrderRow {
            number: order.number.to_string(),
            user_login: order.owner.to_string(),
            status: order.status.as_str().to_string(),
            accrual: order.accrual.map(|a| a.to_string()),
            uploaded_at: timestamp(&order.uploaded_at),
            updated_at: timestamp(&Utc::now()),
        }
    }

    fn balance_row(login: &Login, balance: &Balance) -> BalanceRow {
        BalanceRow {
            user_login: login.to_string(),
            current: balance.current.to_string(),
            withdrawn: balance.withdrawn.to_string(),
        }
    }

    fn order_from_row(row: OrderRow) -> Result<Order> {
        Ok(Order {
            number: OrderNumber::parse(row.number)?,
            owner: Login::parse(row.user_login)?,
            status: OrderStatus::from_str(&row.status)?,
            accrual: row.accrual.as_deref().map(decimal).transpose()?,
            uploaded_at: parse_timestamp(&row.uploaded_at)?,
        })
    }

    fn balance_from_row(row: &BalanceRow) -> Result<Balance> {
        Ok(Balance::new(decimal(&row.current)?, decimal(&row.withdrawn)?))
    }

    fn withdrawal_from_row(row: WithdrawalRow) -> Result<Withdrawal> {
        Ok(Withdrawal {
            order: OrderNumber::parse(row.number)?,
            sum: decimal(&row.amount)?,
            processed_at: parse_timestamp(&row.processed_at)?,
        })
    }
}

fn db_err(e: diesel::result::Error) -> Error {
    Error::Database(e.to_string())
}

// Fixed width keeps lexical order equal to chronological order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(e.to_string()))
}

fn decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| Error::Parse(e.to_string()))
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, login: &Login) -> Result<bool> {
        let row = UserRow {
            login: login.to_string(),
            registered_at: timestamp(&Utc::now()),
        };
        self.with_conn(move |conn| {
            let inserted = diesel::insert_or_ignore_into(users::table)
                .values(&row)
                .execute(conn)
                .map_err(db_err)?;
            Ok(inserted == 1)
        })
        .await
    }

    async fn user_exists(&self, login: &Login) -> Result<bool> {
        let login = login.to_string();
        self.with_conn(move |conn| {
            let found: Option<String> = users::table
                .find(&login)
                .select(users::login)
                .first(conn)
                .optional()
                .map_err(db_err)?;
            Ok(found.is_some())
        })
        .await
    }

    async fn create_order(&self, order: &Order) -> Result<CreateOrder> {
        let row = Self::order_row(order);
        self.with_conn(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let owner: Option<String> = orders::table
                    .find(&row.number)
                    .select(orders::user_login)
                    .first(conn)
                    .optional()?;
                match owner {
                    Some(owner) if owner == row.user_login => Ok(CreateOrder::AlreadyExists),
                    Some(_) => Ok(CreateOrder::Conflict),
                    None => {
                        diesel::insert_into(orders::table)
                            .values(&row)
                            .execute(conn)?;
                        Ok(CreateOrder::Created)
                    }
                }
            })
            .map_err(db_err)
        })
        .await
    }

    async fn discard_order(&self, order: &Order) -> Result<bool> {
        let number = order.number.to_string();
        let owner = order.owner.to_string();
        let removed = self
            .with_conn(move |conn| {
                diesel::delete(
                    orders::table
                        .filter(orders::number.eq(&number))
                        .filter(orders::user_login.eq(&owner))
                        .filter(orders::status.eq(OrderStatus::New.as_str())),
                )
                .execute(conn)
                .map_err(db_err)
            })
            .await?;
        Ok(removed > 0)
    }

    async fn orders_by_user(&self, login: &Login) -> Result<Vec<Order>> {
        let login = login.to_string();
        let rows = self
            .with_conn(move |conn| {
                orders::table
                    .filter(orders::user_login.eq(&login))
                    .order(orders::uploaded_at.desc())
                    .select(OrderRow::as_select())
                    .load(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter().map(Self::order_from_row).collect()
    }

    async fn balance(&self, login: &Login) -> Result<Option<Balance>> {
        let login = login.to_string();
        let row = self
            .with_conn(move |conn| {
                balances::table
                    .find(&login)
                    .select(BalanceRow::as_select())
                    .first(conn)
                    .optional()
                    .map_err(db_err)
            })
            .await?;
        row.as_ref().map(Self::balance_from_row).transpose()
    }

    async fn save_balance(&self, login: &Login, balance: &Balance) -> Result<()> {
        let row = Self::balance_row(login, balance);
        self.with_conn(move |conn| {
            diesel::replace_into(balances::table)
                .values(&row)
                .execute(conn)
                .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn save_order_status(&self, order: &Order, balance: Option<&Balance>) -> Result<()> {
        let row = Self::order_row(order);
        let balance = balance.map(|b| Self::balance_row(&order.owner, b));
        self.with_conn(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let updated = diesel::update(orders::table.find(&row.number))
                    .set((
                        orders::status.eq(&row.status),
                        orders::accrual.eq(&row.accrual),
                        orders::updated_at.eq(&row.updated_at),
                    ))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(diesel::result::Error::NotFound);
                }
                if let Some(balance) = &balance {
                    diesel::replace_into(balances::table)
                        .values(balance)
                        .execute(conn)?;
                }
                Ok(())
            })
            .map_err(db_err)
        })
        .await
    }

    async fn save_withdrawal(
        &self,
        login: &Login,
        withdrawal: &Withdrawal,
        balance: &Balance,
    ) -> Result<bool> {
        let row = WithdrawalRow {
            number: withdrawal.order.to_string(),
            user_login: login.to_string(),
            amount: withdrawal.sum.to_string(),
            processed_at: timestamp(&withdrawal.processed_at),
        };
        let balance = Self::balance_row(login, balance);
        self.with_conn(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let inserted = diesel::insert_or_ignore_into(withdrawals::table)
                    .values(&row)
                    .execute(conn)?;
                if inserted == 0 {
                    return Ok(false);
                }
                diesel::replace_into(balances::table)
                    .values(&balance)
                    .execute(conn)?;
                Ok(true)
            })
            .map_err(db_err)
        })
        .await
    }

    async fn withdrawals_by_user(&self, login: &Login) -> Result<Vec<Withdrawal>> {
        let login = login.to_string();
        let rows = self
            .with_conn(move |conn| {
                withdrawals::table
                    .filter(withdrawals::user_login.eq(&login))
                    .order(withdrawals::processed_at.desc())
                    .select(WithdrawalRow::as_select())
                    .load(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter().map(Self::withdrawal_from_row).collect()
    }

    async fn pending_orders(&self) -> Result<Vec<Order>> {
        let pending = vec![
            OrderStatus::New.as_str(),
            OrderStatus::Processing.as_str(),
        ];
        let rows = self
            .with_conn(move |conn| {
                orders::table
                    .filter(orders::status.eq_any(pending))
                    .order(orders::uploaded_at.asc())
                    .select(OrderRow::as_select())
                    .load(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter().map(Self::order_from_row).collect()
    }

    async fn all_balances(&self) -> Result<Vec<(Login, Balance)>> {
        let rows = self
            .with_conn(|conn| {
                balances::table
                    .select(BalanceRow::as_select())
                    .load(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.iter()
            .map(|row| Ok((Login::parse(row.user_login.as_str())?, Self::balance_from_row(row)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
    use chrono::{Duration, SubsecRound};
    use rust_decimal_macros::dec;

    fn setup_store() -> SqliteStore {
        let pool = create_pool(":memory:").unwrap();
        run_migrations(&pool).unwrap();
        SqliteStore::new(pool)
    }

    fn login(s: &str) -> Login {
        Login::parse(s).unwrap()
    }

    fn order(number: &str, owner: &str) -> Order {
        Order::new(OrderNumber::parse(number).unwrap(), login(owner))
    }

    #[tokio::test]
    async fn create_user_rejects_taken_login() {
        let store = setup_store();
        assert!(store.create_user(&login("alice")).await.unwrap());
        assert!(!store.create_user(&login("alice")).await.unwrap());
        assert!(store.user_exists(&login("alice")).await.unwrap());
        assert!(!store.user_exists(&login("bob")).await.unwrap());
    }

    #[tokio::test]
    async fn create_order_distinguishes_duplicate_from_conflict() {
        let store = setup_store();
        let o = order("49927398716", "alice");

        assert_eq!(store.create_order(&o).await.unwrap(), CreateOrder::Created);
        assert_eq!(store.create_order(&o).await.unwrap(), CreateOrder::AlreadyExists);
        assert_eq!(
            store.create_order(&order("49927398716", "bob")).await.unwrap(),
            CreateOrder::Conflict
        );
    }

    #[tokio::test]
    async fn discard_removes_only_new_orders_of_the_owner() {
        let store = setup_store();
        let mut o = order("49927398716", "alice");
        store.create_order(&o).await.unwrap();

        assert!(!store.discard_order(&order("49927398716", "bob")).await.unwrap());
        assert!(store.discard_order(&o).await.unwrap());
        assert!(store.orders_by_user(&o.owner).await.unwrap().is_empty());
        assert_eq!(store.create_order(&o).await.unwrap(), CreateOrder::Created);

        o.status = OrderStatus::Processing;
        store.save_order_status(&o, None).await.unwrap();
        assert!(!store.discard_order(&o).await.unwrap());
        assert_eq!(store.pending_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn orders_by_user_lists_newest_first() {
        let store = setup_store();
        let mut older = order("49927398716", "alice");
        older.uploaded_at = Utc::now() - Duration::minutes(5);
        let newer = order("79927398713", "alice");

        store.create_order(&older).await.unwrap();
        store.create_order(&newer).await.unwrap();
        store.create_order(&order("4561261212345467", "bob")).await.unwrap();

        let listed = store.orders_by_user(&login("alice")).await.unwrap();
        let numbers: Vec<&str> = listed.iter().map(|o| o.number.as_str()).collect();
        assert_eq!(numbers, vec!["79927398713", "49927398716"]);
    }

    #[tokio::test]
    async fn terminal_status_and_balance_commit_together() {
        let store = setup_store();
        let mut o = order("49927398716", "alice");
        store.create_order(&o).await.unwrap();

        o.status = OrderStatus::Processed;
        o.accrual = Some(dec!(500));
        let balance = Balance::new(dec!(500), dec!(0));
        store.save_order_status(&o, Some(&balance)).await.unwrap();

        let stored = store.orders_by_user(&login("alice")).await.unwrap();
        assert_eq!(stored[0].status, OrderStatus::Processed);
        assert_eq!(stored[0].accrual, Some(dec!(500)));
        assert_eq!(store.balance(&login("alice")).await.unwrap(), Some(balance));
        assert!(store.pending_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_update_for_unknown_order_writes_nothing() {
        let store = setup_store();
        let o = order("49927398716", "alice");
        let balance = Balance::new(dec!(1), dec!(0));

        assert!(store.save_order_status(&o, Some(&balance)).await.is_err());
        assert_eq!(store.balance(&login("alice")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_withdrawal_reference_is_refused() {
        let store = setup_store();
        let alice = login("alice");
        let w = Withdrawal {
            order: OrderNumber::parse("2377225624").unwrap(),
            sum: dec!(10),
            processed_at: Utc::now().trunc_subsecs(6),
        };

        assert!(store
            .save_withdrawal(&alice, &w, &Balance::new(dec!(90), dec!(10)))
            .await
            .unwrap());
        assert!(!store
            .save_withdrawal(&alice, &w, &Balance::new(dec!(80), dec!(20)))
            .await
            .unwrap());

        assert_eq!(
            store.balance(&alice).await.unwrap(),
            Some(Balance::new(dec!(90), dec!(10)))
        );
        assert_eq!(store.withdrawals_by_user(&alice).await.unwrap(), vec![w]);
    }

    #[tokio::test]
    async fn pending_orders_skip_terminal_ones() {
        let store = setup_store();
        let new = order("49927398716", "alice");
        let mut processing = order("79927398713", "alice");
        let mut invalid = order("4561261212345467", "bob");

        for o in [&new, &processing, &invalid] {
            store.create_order(o).await.unwrap();
        }
        processing.status = OrderStatus::Processing;
        store.save_order_status(&processing, None).await.unwrap();
        invalid.status = OrderStatus::Invalid;
        store.save_order_status(&invalid, None).await.unwrap();

        let mut pending: Vec<String> = store
            .pending_orders()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.number.to_string())
            .collect();
        pending.sort();
        assert_eq!(pending, vec!["49927398716", "79927398713"]);
    }

    #[tokio::test]
    async fn all_balances_round_trip_decimals() {
        let store = setup_store();
        store
            .save_balance(&login("alice"), &Balance::new(dec!(12.345), dec!(0.5)))
            .await
            .unwrap();
        store
            .save_balance(&login("bob"), &Balance::default())
            .await
            .unwrap();

        let mut all = store.all_balances().await.unwrap();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            all,
            vec![
                (login("alice"), Balance::new(dec!(12.345), dec!(0.5))),
                (login("bob"), Balance::default()),
            ]
        );
    }
}
