//! Broker connection and gateway tuning, resolved once from the environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where the broker lives and how to authenticate. Immutable after startup
/// and shared read-only by the lifecycle manager, publisher and consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Default for BrokerEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            username: "default".to_string(),
            password: String::new(),
        }
    }
}

impl BrokerEndpoint {
    /// Resolve from `BROKER_*` variables. Inside a container (`DOCKER_ENV`
    /// set) the host defaults to the `broker` service name.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_host = if env::var("DOCKER_ENV").is_ok() {
            "broker"
        } else {
            "localhost"
        };

        Ok(Self {
            host: env::var("BROKER_HOST").unwrap_or_else(|_| default_host.to_string()),
            port: parse_var("BROKER_PORT", 6379)?,
            username: env::var("BROKER_USERNAME").unwrap_or_else(|_| "default".to_string()),
            password: env::var("BROKER_PASSWORD").unwrap_or_default(),
        })
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

/// Retry and queueing policy for the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Fixed delay between stream creation attempts on connection refusal.
    pub retry_delay: Duration,
    /// Attempts used by bulk initialization.
    pub init_max_attempts: u32,
    /// Attempts used when the publish path recreates a missing stream.
    pub recovery_max_attempts: u32,
    /// Capacity of the per-subscription queue between broker and caller.
    pub queue_capacity: usize,
    /// Streams created at startup.
    pub streams: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            init_max_attempts: 10,
            recovery_max_attempts: 5,
            queue_capacity: 256,
            streams: Vec::new(),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let queue_capacity = parse_var("STREAM_QUEUE_CAPACITY", defaults.queue_capacity)?;
        if queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "STREAM_QUEUE_CAPACITY",
                value: "0".to_string(),
                reason: "queue must hold at least one message".to_string(),
            });
        }

        Ok(Self {
            retry_delay: Duration::from_secs(parse_var(
                "STREAM_RETRY_DELAY_SECS",
                defaults.retry_delay.as_secs(),
            )?),
            init_max_attempts: parse_var("STREAM_INIT_MAX_ATTEMPTS", defaults.init_max_attempts)?,
            recovery_max_attempts: parse_var(
                "STREAM_RECOVERY_MAX_ATTEMPTS",
                defaults.recovery_max_attempts,
            )?,
            queue_capacity,
            streams: env::var("STREAM_NAMES")
                .map(|names| parse_stream_list(&names))
                .unwrap_or_default(),
        })
    }
}

/// Split a comma-separated list. Blank entries are kept out; the lifecycle
/// manager would skip them anyway.
pub fn parse_stream_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
