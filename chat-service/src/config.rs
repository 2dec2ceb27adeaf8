use anyhow::{bail, Result};
use std::path::PathBuf;
use std::str::FromStr;

use stream_gateway::{BrokerEndpoint, GatewayConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub broker_backend: BrokerBackend,
    pub broker: BrokerEndpoint,
    pub gateway: GatewayConfig,
    pub localization: LocalizationConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerBackend {
    Redis,
    /// In-process broker for local development; nothing survives a restart.
    Memory,
}

impl FromStr for BrokerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(BrokerBackend::Redis),
            "memory" => Ok(BrokerBackend::Memory),
            other => bail!("unknown broker backend '{}', expected redis or memory", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalizationConfig {
    /// Directory of `<lang>.json` catalogs; built-in catalogs when unset.
    pub locales_dir: Option<PathBuf>,
    pub default_locale: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8085".to_string())
                    .parse()?,
            },
            broker_backend: std::env::var("BROKER_BACKEND")
                .unwrap_or_else(|_| "redis".to_string())
                .parse()?,
            broker: BrokerEndpoint::from_env()?,
            gateway: GatewayConfig::from_env()?,
            localization: LocalizationConfig {
                locales_dir: std::env::var("LOCALES_DIR").ok().map(PathBuf::from),
                default_locale: std::env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en".to_string()),
            },
        })
    }
}
