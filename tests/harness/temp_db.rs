use std::sync::Arc;

use diesel::prelude::*;
use loyalty::adapter::outbound::sqlite::database::connection::{
    create_pool, run_migrations, DbPool,
};
use loyalty::adapter::outbound::SqliteStore;
use loyalty::domain::{Order, OrderStatus};
use loyalty::port::Store;
use tempfile::TempDir;

/// Migrated SQLite file in its own temp directory, removed with the value.
pub struct TempDb {
    pool: DbPool,
    // Declared last so the pool closes before the directory goes.
    _dir: TempDir,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("loyalty-{name}-"))
            .tempdir()
            .expect("create temp dir");
        let url = format!("sqlite://{}", dir.path().join("loyalty.db").display());
        let pool = create_pool(&url).expect("create sqlite pool");
        run_migrations(&pool).expect("run migrations");

        // Lanes, workers and the service write concurrently.
        {
            let mut conn = pool.get().expect("get sqlite connection");
            diesel::sql_query("PRAGMA journal_mode=WAL")
                .execute(&mut conn)
                .expect("enable WAL mode");
        }

        Self { pool, _dir: dir }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        Arc::new(SqliteStore::new(self.pool.clone()))
    }

    /// Store orders as a previous run would have left them: created, then
    /// moved to their current status.
    pub async fn seed(&self, orders: &[Order]) {
        let store = self.store();
        for order in orders {
            store.create_order(order).await.expect("seed order");
            if order.status != OrderStatus::New {
                store
                    .save_order_status(order, None)
                    .await
                    .expect("seed order status");
            }
        }
    }
}
