//! Environment configuration for the advice pipeline and the mail relay
//!
//! Absent variables take their defaults; present but malformed values are
//! an error rather than silently ignored.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::services::advice::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::services::advice::inference::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::services::advice::limiter::DEFAULT_MIN_INTERVAL;
use crate::services::advice::RetryPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {name}")]
    InvalidValue { name: String, value: String },
}

/// Read `name` and parse it, using `default` when unset or empty
pub fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            })
        }
        _ => Ok(default),
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Settings for inference, caching, rate limiting and retries
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub inference_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub min_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            inference_timeout: Duration::from_secs(30),
            cache_ttl: DEFAULT_TTL,
            cache_capacity: DEFAULT_CAPACITY,
            min_interval: DEFAULT_MIN_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }
}

impl AdviceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let retry = RetryPolicy {
            max_attempts: parse_env("RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts)?.max(1),
            base_delay: Duration::from_millis(parse_env(
                "RETRY_BASE_DELAY_MS",
                defaults.retry.base_delay.as_millis() as u64,
            )?),
            ..defaults.retry.clone()
        };

        Ok(Self {
            api_key: optional_env("OPENAI_API_KEY"),
            model: optional_env("OPENAI_MODEL").unwrap_or(defaults.model),
            base_url: optional_env("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            inference_timeout: Duration::from_secs(parse_env(
                "INFERENCE_TIMEOUT_SECS",
                defaults.inference_timeout.as_secs(),
            )?),
            cache_ttl: Duration::from_secs(parse_env(
                "ADVICE_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            cache_capacity: parse_env("ADVICE_CACHE_CAPACITY", defaults.cache_capacity)?,
            min_interval: Duration::from_millis(parse_env(
                "RATE_LIMIT_INTERVAL_MS",
                defaults.min_interval.as_millis() as u64,
            )?),
            retry,
        })
    }
}

/// Mail relay settings; without a relay URL reports are only logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub relay_url: Option<String>,
    pub relay_token: Option<String>,
    pub from: String,
    pub timeout: Duration,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            relay_token: None,
            from: "BPGuide <no-reply@bpguide.local>".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl MailConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            relay_url: optional_env("MAIL_RELAY_URL"),
            relay_token: optional_env("MAIL_RELAY_TOKEN"),
            from: optional_env("MAIL_FROM").unwrap_or(defaults.from),
            timeout: defaults.timeout,
        })
    }
}
