//! SQLite persistence adapters.
//!
//! Provides the SQLite-backed [`Store`](crate::port::Store) using Diesel ORM.

pub mod database;
pub mod store;

pub use store::SqliteStore;
