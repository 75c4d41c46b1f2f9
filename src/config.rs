//! Configuration management

use anyhow::{Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Directory where uploaded CSV files are stored
    pub upload_dir: String,

    /// How often the import worker polls for pending jobs (seconds)
    pub import_poll_interval_secs: u64,

    /// Rows between progress flushes during an import
    pub import_batch_size: usize,

    /// How often the cleanup worker sweeps terminal jobs (hours)
    pub cleanup_interval_hours: u64,

    /// Days a completed job is kept before cleanup
    pub success_retention_days: i64,

    /// Days a failed job is kept before cleanup
    pub failed_retention_days: i64,
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Intervals and batch sizes must be positive: a zero would panic the
/// worker tickers and the progress modulo, so it falls back to the
/// default like a missing variable.
fn env_parsed_nonzero(name: &str, default: u64) -> Result<u64> {
    let value = env_parsed(name, default)?;
    if value == 0 {
        tracing::warn!("{} must be positive, using default {}", name, default);
        return Ok(default);
    }
    Ok(value)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        let upload_dir = std::env::var("UPLOAD_DIR")
            .unwrap_or_else(|_| "./uploads/imports".to_string());

        Ok(Self {
            nats_url,
            database_url,
            upload_dir,
            import_poll_interval_secs: env_parsed_nonzero("IMPORT_POLL_INTERVAL_SECS", 10)?,
            import_batch_size: env_parsed_nonzero("IMPORT_BATCH_SIZE", 100)? as usize,
            cleanup_interval_hours: env_parsed_nonzero("CLEANUP_INTERVAL_HOURS", 24)?,
            success_retention_days: env_parsed("SUCCESS_RETENTION_DAYS", 30)?,
            failed_retention_days: env_parsed("FAILED_RETENTION_DAYS", 90)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_defaults_when_optionals_unset() {
        std::env::set_var("DATABASE_URL", "postgres://test");
        for name in [
            "NATS_URL",
            "UPLOAD_DIR",
            "IMPORT_POLL_INTERVAL_SECS",
            "IMPORT_BATCH_SIZE",
            "CLEANUP_INTERVAL_HOURS",
            "SUCCESS_RETENTION_DAYS",
            "FAILED_RETENTION_DAYS",
        ] {
            std::env::remove_var(name);
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert_eq!(config.upload_dir, "./uploads/imports");
        assert_eq!(config.import_poll_interval_secs, 10);
        assert_eq!(config.import_batch_size, 100);
        assert_eq!(config.cleanup_interval_hours, 24);
        assert_eq!(config.success_retention_days, 30);
        assert_eq!(config.failed_retention_days, 90);
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_reads_overrides() {
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("IMPORT_POLL_INTERVAL_SECS", "5");
        std::env::set_var("SUCCESS_RETENTION_DAYS", "7");

        let config = Config::from_env().unwrap();
        assert_eq!(config.import_poll_interval_secs, 5);
        assert_eq!(config.success_retention_days, 7);

        // Cleanup
        std::env::remove_var("IMPORT_POLL_INTERVAL_SECS");
        std::env::remove_var("SUCCESS_RETENTION_DAYS");
    }

    #[test]
    fn test_zero_interval_falls_back_to_default() {
        std::env::set_var("POLL_INTERVAL_TEST_ZERO", "0");
        assert_eq!(env_parsed_nonzero("POLL_INTERVAL_TEST_ZERO", 10).unwrap(), 10);
        std::env::remove_var("POLL_INTERVAL_TEST_ZERO");

        std::env::set_var("BATCH_SIZE_TEST_NONZERO", "25");
        assert_eq!(env_parsed_nonzero("BATCH_SIZE_TEST_NONZERO", 100).unwrap(), 25);
        std::env::remove_var("BATCH_SIZE_TEST_NONZERO");
    }

    #[test]
    fn test_env_parsed_rejects_garbage() {
        std::env::set_var("IMPORT_BATCH_SIZE_TEST_GARBAGE", "lots");
        let result: Result<usize> = env_parsed("IMPORT_BATCH_SIZE_TEST_GARBAGE", 100);
        assert!(result.is_err());
        std::env::remove_var("IMPORT_BATCH_SIZE_TEST_GARBAGE");
    }
}
