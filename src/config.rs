//! Process configuration from environment variables

use std::path::PathBuf;

use thiserror::Error;

use crate::health::HEALTH_PORT;
use crate::webhooks::{TlsFiles, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT};

pub const RULES_PATH_ENV: &str = "HOSTPATH_RULES_PATH";
pub const WEBHOOK_PORT_ENV: &str = "WEBHOOK_PORT";
pub const WEBHOOK_CERT_PATH_ENV: &str = "WEBHOOK_CERT_PATH";
pub const WEBHOOK_KEY_PATH_ENV: &str = "WEBHOOK_KEY_PATH";
pub const HEALTH_PORT_ENV: &str = "HEALTH_PORT";

/// Default rule file, relative to the working directory
pub const DEFAULT_RULES_PATH: &str = "rules.yaml";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}: expected a port number")]
    InvalidPort { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rules_path: PathBuf,
    pub webhook_port: u16,
    pub tls: TlsFiles,
    pub health_port: u16,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for unset variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |name: &str, default: &str| {
            PathBuf::from(lookup(name).unwrap_or_else(|| default.to_string()))
        };

        Ok(Self {
            rules_path: path(RULES_PATH_ENV, DEFAULT_RULES_PATH),
            webhook_port: port(&lookup, WEBHOOK_PORT_ENV, WEBHOOK_PORT)?,
            tls: TlsFiles::new(
                path(WEBHOOK_CERT_PATH_ENV, WEBHOOK_CERT_PATH),
                path(WEBHOOK_KEY_PATH_ENV, WEBHOOK_KEY_PATH),
            ),
            health_port: port(&lookup, HEALTH_PORT_ENV, HEALTH_PORT)?,
        })
    }
}

fn port<F>(lookup: &F, name: &'static str, default: u16) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort { name, value }),
        None => Ok(default),
    }
}
