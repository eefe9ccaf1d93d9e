use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SeedError;
use crate::registry::SelectionMode;
use crate::retry::RetryPolicy;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8003";
pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedsConfig {
    /// Base URL of the HTTP gateway the fixtures are created through
    pub gateway_url: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Upper bound on users being built at the same time
    pub workers: usize,
    pub retry: RetryPolicy,
    /// Directory holding one `<scenario>_seeds.json` per scenario
    pub dumps_dir: PathBuf,
    pub selection: SelectionMode,
}

impl Default for SeedsConfig {
    fn default() -> Self {
        SeedsConfig {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            workers: DEFAULT_WORKERS,
            retry: RetryPolicy::default(),
            dumps_dir: PathBuf::from("dumps"),
            selection: SelectionMode::default(),
        }
    }
}

impl SeedsConfig {
    /// # Errors
    /// Errors when the worker pool or the retry budget is empty.
    pub fn validate(&self) -> Result<(), SeedError> {
        if self.workers == 0 {
            return Err(SeedError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(SeedError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(SeedError::InvalidConfig(
                "retry.multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SeedsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = SeedsConfig {
            workers: 0,
            ..SeedsConfig::default()
        };
        assert!(matches!(config.validate(), Err(SeedError::InvalidConfig(_))));

        let mut config = SeedsConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = SeedsConfig::default();
        config.retry.multiplier = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_document() {
        let config: SeedsConfig = serde_json::from_str(
            r#"{ "workers": 2, "request_timeout": "5s", "retry": { "max_attempts": 5 } }"#,
        )
        .unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(200));
        assert_eq!(config.gateway_url, DEFAULT_GATEWAY_URL);
    }
}
