use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Raw environment variables, one field per variable (lowercased).
#[derive(Deserialize)]
struct EnvConf {
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default = "default_bind_address")]
    bind_address: SocketAddr,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_run_migrations")]
    run_migrations: bool,
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_run_migrations() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub database_url: String,
    pub bind_address: SocketAddr,
    pub request_timeout: Duration,
    pub run_migrations: bool,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Reads the variables from `vars` instead of the process environment
    /// when given.
    pub fn from_source(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let env: EnvConf = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true).source(vars))
            .build()?
            .try_deserialize()?;

        let database_url = env
            .database_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        if env.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_SECS",
                value: env.request_timeout_secs.to_string(),
            });
        }

        Ok(ServiceConfig {
            database_url,
            bind_address: env.bind_address,
            request_timeout: Duration::from_secs(env.request_timeout_secs),
            run_migrations: env.run_migrations,
        })
    }
}
