//! Configuration and order-number checks.

use std::path::Path;

use crate::app::Config;
use crate::cli::output;
use crate::domain::{luhn_valid, DomainError};
use crate::error::{Error, Result};

/// Validate a configuration file without starting the engine.
///
/// # Errors
/// Returns the load or validation error.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());

    let config = Config::load(path)?;
    output::ok("Configuration file is valid");

    output::section("Summary");
    output::key_value("Database", &config.database.url);
    output::key_value("Accrual service", &config.accrual.address);
    output::key_value("Request timeout", format!("{}s", config.accrual.request_timeout_secs));
    output::key_value("Poll workers", config.engine.poll_workers);
    output::key_value("Reconcile lanes", config.engine.reconcile_workers);
    output::key_value("Queue capacity", config.engine.queue_capacity);
    output::key_value("Poll interval", format!("{}ms", config.engine.poll_interval_ms));
    output::key_value("Log level", &config.logging.level);
    Ok(())
}

/// Report whether `number` passes the mod-10 checksum.
///
/// # Errors
/// [`DomainError::InvalidOrderNumber`] when it does not.
pub fn execute_number(number: &str) -> Result<()> {
    if luhn_valid(number) {
        output::ok(&format!("{number} is a valid order number"));
        Ok(())
    } else {
        Err(Error::Domain(DomainError::InvalidOrderNumber {
            number: number.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn number_check_follows_checksum() {
        assert!(execute_number("49927398716").is_ok());
        assert!(execute_number("49927398717").is_err());
        assert!(execute_number("").is_err());
    }

    #[test]
    fn config_check_reports_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nqueue_capacity = 0").unwrap();
        assert!(execute_config(file.path()).is_err());
    }
}
