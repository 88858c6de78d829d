//! Process configuration, read once at startup.
//!
//! Values come from the environment (optionally seeded from a `.env` file by `main`). A
//! missing or malformed value is a startup failure; nothing here is consulted again once the
//! server is running.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::backend::storage::DatabaseTargets;

pub const DB_DIR_VAR: &str = "MOLE_DB_DIR";
pub const ACCOUNT_DB_VAR: &str = "MOLE_ACCOUNT_DB";
pub const COMMERCE_DB_VAR: &str = "MOLE_COMMERCE_DB";
pub const BIND_ADDR_VAR: &str = "MOLE_BIND_ADDR";
pub const ENV_VAR: &str = "MOLE_ENV";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value `{value}` for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment flavour selected by `MOLE_ENV`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Test,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => f.write_str("dev"),
            Environment::Test => f.write_str("test"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_dir: PathBuf,
    pub account_db: String,
    pub commerce_db: String,
    pub bind_addr: SocketAddr,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let db_dir = PathBuf::from(required(DB_DIR_VAR)?);
        let account_db = required(ACCOUNT_DB_VAR)?;
        let commerce_db = required(COMMERCE_DB_VAR)?;
        if account_db == commerce_db {
            return Err(ConfigError::Invalid {
                var: COMMERCE_DB_VAR,
                value: commerce_db,
                reason: format!("must differ from {}", ACCOUNT_DB_VAR),
            });
        }

        let bind_value = lookup(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_value
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: BIND_ADDR_VAR,
                value: bind_value.clone(),
                reason: e.to_string(),
            })?;

        let environment = match lookup(ENV_VAR).as_deref().map(str::trim) {
            None | Some("") | Some("dev") => Environment::Dev,
            Some("test") => Environment::Test,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: ENV_VAR,
                    value: other.to_string(),
                    reason: "expected `dev` or `test`".to_string(),
                })
            }
        };

        Ok(Self {
            db_dir,
            account_db,
            commerce_db,
            bind_addr,
            environment,
        })
    }

    pub fn database_targets(&self) -> DatabaseTargets {
        DatabaseTargets {
            account_url: self.database_url(&self.account_db),
            commerce_url: self.database_url(&self.commerce_db),
        }
    }

    fn database_url(&self, name: &str) -> String {
        format!("sqlite:{}", self.db_dir.join(format!("{}.db", name)).display())
    }
}
