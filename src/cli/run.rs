//! Handler for the `run` command.

use std::sync::Arc;

use tokio::signal;
use tracing::info;

use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
use crate::adapter::outbound::{AccrualClient, MemoryStore, SqliteStore};
use crate::app::{Config, Engine, LogFormat};
use crate::cli::RunArgs;
use crate::error::Result;
use crate::port::Store;

/// Execute the run command.
///
/// # Errors
/// Configuration, database and recovery failures abort startup.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::resolve(args.config.as_deref(), &args.overrides())?;

    if let Some(ref level) = args.log_level {
        config.logging.level.clone_from(level);
    }
    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }
    config.init_logging();

    let database = if args.in_memory {
        "memory"
    } else {
        config.database.url.as_str()
    };
    info!(
        database,
        accrual = %config.accrual.address,
        "loyalty starting"
    );

    let store: Arc<dyn Store> = if args.in_memory {
        Arc::new(MemoryStore::new())
    } else {
        let pool = create_pool(&config.database.url)?;
        run_migrations(&pool)?;
        info!(database = %config.database.url, "Database initialized");
        Arc::new(SqliteStore::new(pool))
    };
    let source = Arc::new(AccrualClient::new(
        &config.accrual.address,
        config.accrual.request_timeout(),
    )?);

    let engine = Engine::start(config.engine_settings(), store, source).await?;
    info!(
        recovered = engine.recovered().registered,
        balances = engine.ledger().len(),
        "Engine running"
    );

    signal::ctrl_c().await?;
    info!("Shutdown signal received");
    engine.shutdown().await;

    info!("loyalty stopped");
    Ok(())
}
