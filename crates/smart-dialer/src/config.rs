// smart-dialer/crates/smart-dialer/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::ordering::RecencyPolicy;

pub const DEFAULT_RECENCY_THRESHOLD_DAYS: i64 = 3;
pub const DEFAULT_THIS_WEEK_DAYS: i64 = 7;
/// Upper bound for any day-based window (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

#[derive(Debug, Clone)]
pub struct DialerConfig {
    pub database_path: PathBuf,
    /// Contacts called within this many days rank in the recent tier.
    pub recency_threshold_days: i64,
    /// Window used by call-date labels to show a weekday instead of a full date.
    pub this_week_days: i64,
    pub pool_size: u32,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("call_counters.db"),
            recency_threshold_days: DEFAULT_RECENCY_THRESHOLD_DAYS,
            this_week_days: DEFAULT_THIS_WEEK_DAYS,
            pool_size: 4,
        }
    }
}

impl DialerConfig {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        let defaults = Self::default();

        let database_path = env::var("DIALER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let recency_threshold_days =
            read_var("DIALER_RECENCY_DAYS", defaults.recency_threshold_days)?;
        let this_week_days = read_var("DIALER_THIS_WEEK_DAYS", defaults.this_week_days)?;
        let pool_size = read_var("DIALER_DB_POOL_SIZE", defaults.pool_size)?;

        let config = Self {
            database_path,
            recency_threshold_days,
            this_week_days,
            pool_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_WINDOW_DAYS).contains(&self.recency_threshold_days) {
            anyhow::bail!(
                "recency threshold must be between 0 and {} days, got {}",
                MAX_WINDOW_DAYS,
                self.recency_threshold_days
            );
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.this_week_days) {
            anyhow::bail!(
                "this-week window must be between 0 and {} days, got {}",
                MAX_WINDOW_DAYS,
                self.this_week_days
            );
        }
        if self.pool_size == 0 {
            anyhow::bail!("database pool size must be at least 1");
        }
        Ok(())
    }

    pub fn recency_policy(&self) -> RecencyPolicy {
        RecencyPolicy::from_days(self.recency_threshold_days)
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- Database Path: {}", self.database_path.display());
        info!("- Recency Threshold: {} days", self.recency_threshold_days);
        info!("- This Week Window: {} days", self.this_week_days);
        info!("- Pool Size: {}", self.pool_size);
    }
}

fn read_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    // ===== Defaults =====

    #[test]
    fn test_default_thresholds_are_independent() {
        let config = DialerConfig::default();

        assert_eq!(config.recency_threshold_days, 3);
        assert_eq!(config.this_week_days, 7);
        assert_eq!(config.database_path, PathBuf::from("call_counters.db"));
    }

    #[test]
    fn test_recency_policy_uses_threshold() {
        let config = DialerConfig {
            recency_threshold_days: 5,
            ..Default::default()
        };

        assert_eq!(config.recency_policy().threshold(), Duration::days(5));
    }

    // ===== Validation =====

    #[test]
    fn test_validate_rejects_negative_threshold() {
        let config = DialerConfig {
            recency_threshold_days: -1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_windows() {
        let config = DialerConfig {
            recency_threshold_days: i64::MAX / 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DialerConfig {
            this_week_days: MAX_WINDOW_DAYS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recency_policy_saturates_instead_of_panicking() {
        let config = DialerConfig {
            recency_threshold_days: i64::MAX / 2,
            ..Default::default()
        };
        assert_eq!(config.recency_policy().threshold(), Duration::MAX);
    }

    #[test]
    fn test_validate_rejects_empty_pool() {
        let config = DialerConfig {
            pool_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(DialerConfig::default().validate().is_ok());
    }

    // ===== Env parsing =====

    #[test]
    fn test_read_var_parses_and_falls_back() {
        env::set_var("SMART_DIALER_TEST_READ_VAR", " 12 ");
        let parsed: i64 = read_var("SMART_DIALER_TEST_READ_VAR", 3).unwrap();
        assert_eq!(parsed, 12);
        env::remove_var("SMART_DIALER_TEST_READ_VAR");

        let fallback: i64 = read_var("SMART_DIALER_TEST_READ_VAR_MISSING", 3).unwrap();
        assert_eq!(fallback, 3);
    }

    #[test]
    fn test_read_var_reports_bad_value() {
        env::set_var("SMART_DIALER_TEST_BAD_VAR", "three");
        let result: Result<i64> = read_var("SMART_DIALER_TEST_BAD_VAR", 3);
        env::remove_var("SMART_DIALER_TEST_BAD_VAR");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("SMART_DIALER_TEST_BAD_VAR"));
    }
}
