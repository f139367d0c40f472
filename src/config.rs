use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (after `dotenv`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: Option<u32>,
    pub sql_logging: bool,
    pub run_migrations: bool,
}

impl Config {
    /// `DATABASE_URL` is required; `DATABASE_MAX_CONNECTIONS`,
    /// `DATABASE_SQL_LOGGING` and `RUN_MIGRATIONS` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            max_connections: optional_var("DATABASE_MAX_CONNECTIONS")?,
            sql_logging: optional_var("DATABASE_SQL_LOGGING")?.unwrap_or(false),
            run_migrations: optional_var("RUN_MIGRATIONS")?.unwrap_or(true),
        })
    }

    /// Single-connection in-memory SQLite database.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: Some(1),
            sql_logging: false,
            run_migrations: true,
        }
    }
}

fn optional_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(None),
    }
}
