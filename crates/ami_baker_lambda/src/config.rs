//! Process configuration read once at cold start.
//!
//! There is no configuration file; everything that varies per deployment is an
//! environment variable, and everything that varies per resource arrives in
//! the event's `ResourceProperties`.

use std::time::Duration;

use thiserror::Error;

pub const PROVIDER_TIMEOUT_ENV: &str = "AMI_BAKER_PROVIDER_TIMEOUT_SECS";
pub const CALLBACK_TIMEOUT_ENV: &str = "AMI_BAKER_CALLBACK_TIMEOUT_SECS";

pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got: {value}")]
    InvalidSeconds { name: &'static str, value: String },

    #[error("{name} must be greater than 0")]
    ZeroTimeout { name: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Bound on each EC2 operation, including connect and read.
    pub provider_timeout: Duration,
    pub callback_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            callback_timeout: Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            provider_timeout: timeout_from(
                PROVIDER_TIMEOUT_ENV,
                lookup(PROVIDER_TIMEOUT_ENV),
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            )?,
            callback_timeout: timeout_from(
                CALLBACK_TIMEOUT_ENV,
                lookup(CALLBACK_TIMEOUT_ENV),
                DEFAULT_CALLBACK_TIMEOUT_SECS,
            )?,
        })
    }
}

fn timeout_from(
    name: &'static str,
    value: Option<String>,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = value.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Duration::from_secs(default_secs));
    };

    let seconds = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidSeconds {
            name,
            value: raw.clone(),
        })?;
    if seconds == 0 {
        return Err(ConfigError::ZeroTimeout { name });
    }
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[])).expect("defaults should load");
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[
            (PROVIDER_TIMEOUT_ENV, "120"),
            (CALLBACK_TIMEOUT_ENV, " 5 "),
        ]))
        .expect("overrides should load");

        assert_eq!(config.provider_timeout, Duration::from_secs(120));
        assert_eq!(config.callback_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_invalid_values() {
        let error = RuntimeConfig::from_lookup(lookup_from(&[(PROVIDER_TIMEOUT_ENV, "soon")]))
            .expect_err("non-numeric timeout should fail");
        assert_eq!(
            error,
            ConfigError::InvalidSeconds {
                name: PROVIDER_TIMEOUT_ENV,
                value: "soon".to_string(),
            }
        );

        let error = RuntimeConfig::from_lookup(lookup_from(&[(CALLBACK_TIMEOUT_ENV, "0")]))
            .expect_err("zero timeout should fail");
        assert_eq!(
            error,
            ConfigError::ZeroTimeout {
                name: CALLBACK_TIMEOUT_ENV
            }
        );
    }
}
