//! Database model types for Diesel ORM.
//!
//! Decimals and timestamps are stored as text; conversion to domain types
//! happens in [`super::super::store`].

use diesel::prelude::*;

use super::schema::{balances, orders, users, withdrawals};

/// Database row for a registered user.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub login: String,
    pub registered_at: String,
}

/// Database row for an order and its latest known status.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub number: String,
    pub user_login: String,
    pub status: String,
    pub accrual: Option<String>,
    pub uploaded_at: String,
    pub updated_at: String,
}

/// Database row for a user's balance.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = balances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BalanceRow {
    pub user_login: String,
    pub current: String,
    pub withdrawn: String,
}

/// Database row for a withdrawal.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = withdrawals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WithdrawalRow {
    pub number: String,
    pub user_login: String,
    pub amount: String,
    pub processed_at: String,
}
