//! Outbound adapters (driven side).

pub mod accrual;
pub mod memory;
pub mod sqlite;

pub use accrual::AccrualClient;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
