//! Retry configuration loaded from TOML files.
//!
//! The file has two sections, `[strategy]` and `[clock_skew]`; every key is
//! optional and falls back to the built-in default.
//!
//! ```toml
//! [strategy]
//! base_delay_ms = 100
//! throttling_base_delay_ms = 500
//! max_delay_ms = 20000
//! max_attempts = 3
//! jitter_percent = 10
//!
//! [clock_skew]
//! sensitive_status_codes = [401, 403]
//! threshold_secs = 240
//! possible_skew_codes_on_any_status = false
//! ```

use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use crate::exception::clock_skew::{
    ClockSkewPolicy, DEFAULT_SKEW_SENSITIVE_STATUS_CODES, DEFAULT_SKEW_THRESHOLD_SECS,
};
use crate::retry::RetryStrategy;

/// Prefix of environment variables that override file values,
/// e.g. `SVC_RETRY__STRATEGY__MAX_ATTEMPTS=5`.
pub const ENV_PREFIX: &str = "SVC_RETRY";

/// Errors that can occur when loading retry configuration.
#[derive(Error, Debug)]
pub enum RetryConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid file path.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The configuration could not be read or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The values were read but do not make sense together.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Backoff settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Base delay for ordinary retries, in milliseconds.
    pub base_delay_ms: u64,
    /// Base delay for throttled retries, in milliseconds.
    pub throttling_base_delay_ms: u64,
    /// Upper bound for any delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Jitter applied to delays, as a percentage.
    pub jitter_percent: u8,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let strategy = RetryStrategy::default();
        Self {
            base_delay_ms: strategy.base_delay.as_millis() as u64,
            throttling_base_delay_ms: strategy.throttling_base_delay.as_millis() as u64,
            max_delay_ms: strategy.max_delay.as_millis() as u64,
            max_attempts: strategy.max_attempts,
            jitter_percent: strategy.jitter_percent,
        }
    }
}

/// Clock skew detection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClockSkewConfig {
    /// Status codes for which the `Date` header is checked.
    pub sensitive_status_codes: Vec<u16>,
    /// Tolerated skew, in seconds.
    pub threshold_secs: i64,
    /// Check the `Date` header for possible-skew error codes on any status.
    pub possible_skew_codes_on_any_status: bool,
}

impl Default for ClockSkewConfig {
    fn default() -> Self {
        Self {
            sensitive_status_codes: DEFAULT_SKEW_SENSITIVE_STATUS_CODES.to_vec(),
            threshold_secs: DEFAULT_SKEW_THRESHOLD_SECS,
            possible_skew_codes_on_any_status: false,
        }
    }
}

/// Complete retry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Backoff settings.
    pub strategy: StrategyConfig,
    /// Clock skew detection settings.
    pub clock_skew: ClockSkewConfig,
}

impl RetryConfig {
    /// Load configuration from a TOML file, with `SVC_RETRY__` environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration file does not exist
    /// - The configuration file cannot be parsed
    /// - The values fail validation
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RetryConfigError> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    /// Like [`RetryConfig::load`], reading overrides under a custom prefix.
    pub fn load_with_env_prefix<P: AsRef<Path>>(
        path: P,
        env_prefix: &str,
    ) -> Result<Self, RetryConfigError> {
        let path = path.as_ref();

        let path_str = path
            .to_str()
            .ok_or_else(|| RetryConfigError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(RetryConfigError::FileNotFound(path_str.to_string()));
        }

        let builder = Config::builder().add_source(File::new(path_str, FileFormat::Toml));
        Self::finish(builder, env_prefix)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, RetryConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        let retry_config: RetryConfig = config.try_deserialize()?;
        retry_config.validate()?;
        Ok(retry_config)
    }

    fn finish(
        builder: ConfigBuilder<DefaultState>,
        env_prefix: &str,
    ) -> Result<Self, RetryConfigError> {
        // Double underscore separates nested keys; status code lists are
        // comma-separated.
        let config = builder
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("clock_skew.sensitive_status_codes")
                    .try_parsing(true),
            )
            .build()?;

        let retry_config: RetryConfig = config.try_deserialize()?;
        retry_config.validate()?;
        Ok(retry_config)
    }

    /// Checks that the values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`RetryConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        let strategy = &self.strategy;
        if strategy.max_attempts == 0 {
            return Err(RetryConfigError::Invalid(
                "strategy.max_attempts must be at least 1".to_string(),
            ));
        }
        if strategy.base_delay_ms > strategy.max_delay_ms {
            return Err(RetryConfigError::Invalid(format!(
                "strategy.base_delay_ms ({}) exceeds strategy.max_delay_ms ({})",
                strategy.base_delay_ms, strategy.max_delay_ms
            )));
        }
        if strategy.jitter_percent > 100 {
            return Err(RetryConfigError::Invalid(format!(
                "strategy.jitter_percent ({}) exceeds 100",
                strategy.jitter_percent
            )));
        }
        if self.clock_skew.threshold_secs < 0 {
            return Err(RetryConfigError::Invalid(
                "clock_skew.threshold_secs must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the retry strategy described by this configuration.
    pub fn retry_strategy(&self) -> RetryStrategy {
        let strategy = &self.strategy;
        RetryStrategy {
            base_delay: Duration::from_millis(strategy.base_delay_ms),
            throttling_base_delay: Duration::from_millis(strategy.throttling_base_delay_ms),
            max_delay: Duration::from_millis(strategy.max_delay_ms),
            max_attempts: strategy.max_attempts,
            jitter_percent: strategy.jitter_percent,
            ..RetryStrategy::default()
        }
    }

    /// Builds the clock skew policy described by this configuration.
    pub fn clock_skew_policy(&self) -> ClockSkewPolicy {
        ClockSkewPolicy::new()
            .with_sensitive_status_codes(self.clock_skew.sensitive_status_codes.clone())
            .with_threshold(chrono::Duration::seconds(self.clock_skew.threshold_secs))
            .with_possible_skew_codes_on_any_status(
                self.clock_skew.possible_skew_codes_on_any_status,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_strategy_and_policy() {
        let config = RetryConfig::default();
        assert!(config.validate().is_ok());

        let strategy = config.retry_strategy();
        let default_strategy = RetryStrategy::default();
        assert_eq!(strategy.base_delay, default_strategy.base_delay);
        assert_eq!(strategy.max_delay, default_strategy.max_delay);
        assert_eq!(strategy.max_attempts, default_strategy.max_attempts);
        assert_eq!(config.clock_skew_policy(), ClockSkewPolicy::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = RetryConfig::from_toml_str(
            r#"
            [strategy]
            max_attempts = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.strategy.max_attempts, 8);
        assert_eq!(config.strategy.base_delay_ms, 100);
        assert_eq!(config.clock_skew, ClockSkewConfig::default());
    }

    #[test]
    fn test_full_file() {
        let config = RetryConfig::from_toml_str(
            r#"
            [strategy]
            base_delay_ms = 250
            throttling_base_delay_ms = 1000
            max_delay_ms = 30000
            max_attempts = 4
            jitter_percent = 0

            [clock_skew]
            sensitive_status_codes = [400, 401, 403]
            threshold_secs = 60
            possible_skew_codes_on_any_status = true
            "#,
        )
        .unwrap();

        let strategy = config.retry_strategy();
        assert_eq!(strategy.base_delay, Duration::from_millis(250));
        assert_eq!(strategy.throttling_base_delay, Duration::from_secs(1));
        assert_eq!(strategy.max_delay, Duration::from_secs(30));
        assert_eq!(strategy.max_attempts, 4);
        assert_eq!(strategy.jitter_percent, 0);

        let policy = config.clock_skew_policy();
        assert_eq!(policy.sensitive_status_codes(), &[400, 401, 403]);
        assert_eq!(policy.threshold(), chrono::Duration::seconds(60));
        assert!(policy.possible_skew_codes_on_any_status());
    }

    #[test]
    fn test_validation_errors() {
        let zero_attempts = RetryConfig::from_toml_str("[strategy]\nmax_attempts = 0\n");
        assert!(matches!(zero_attempts, Err(RetryConfigError::Invalid(_))));

        let inverted = RetryConfig::from_toml_str(
            "[strategy]\nbase_delay_ms = 5000\nmax_delay_ms = 1000\n",
        );
        assert!(matches!(inverted, Err(RetryConfigError::Invalid(_))));

        let negative = RetryConfig::from_toml_str("[clock_skew]\nthreshold_secs = -1\n");
        assert!(matches!(negative, Err(RetryConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = RetryConfig::from_toml_str("[strategy\nmax_attempts = 2");
        assert!(matches!(result, Err(RetryConfigError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = RetryConfig::load("/nonexistent/svc-retry.toml");
        assert!(matches!(result, Err(RetryConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_file_with_env_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[strategy]\nmax_attempts = 2\nbase_delay_ms = 50").unwrap();

        let prefix = "SVC_RETRY_SETTINGS_TEST";
        std::env::set_var(format!("{}__STRATEGY__MAX_ATTEMPTS", prefix), "6");
        let config = RetryConfig::load_with_env_prefix(file.path(), prefix).unwrap();
        std::env::remove_var(format!("{}__STRATEGY__MAX_ATTEMPTS", prefix));

        assert_eq!(config.strategy.max_attempts, 6);
        assert_eq!(config.strategy.base_delay_ms, 50);
    }
}
