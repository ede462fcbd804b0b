use std::env;
use std::net::SocketAddr;

use thiserror::Error;

pub const BIND_VAR: &str = "SAHABAT_BIND";
const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a socket address: {value}")]
    InvalidAddress { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = env::var(BIND_VAR).unwrap_or_else(|_| DEFAULT_BIND.to_string());
        Self::from_bind(&value)
    }

    fn from_bind(value: &str) -> Result<Self, ConfigError> {
        let bind = value.parse().map_err(|_| ConfigError::InvalidAddress {
            key: BIND_VAR,
            value: value.to_string(),
        })?;
        Ok(Self { bind })
    }
}
