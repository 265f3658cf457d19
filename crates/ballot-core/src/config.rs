//! Runtime configuration.
//!
//! ```bash
//! BALLOT_DATABASE_URL=sqlite://ballot.db   # falls back to DATABASE_URL
//! BALLOT_DB_MAX_CONNECTIONS=5
//! BALLOT_LOG=info,ballot_core=debug        # tracing EnvFilter directives
//! ```

use std::env;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://ballot.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub log_filter: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid BALLOT_DB_MAX_CONNECTIONS value '{0}': expected a positive number")]
    InvalidMaxConnections(String),

    #[error("Invalid BALLOT_LOG value '{value}': {reason}")]
    InvalidLogFilter { value: String, reason: String },
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl BallotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("BALLOT_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let max_connections = match env::var("BALLOT_DB_MAX_CONNECTIONS") {
            Ok(v) => match v.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidMaxConnections(v)),
            },
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        let log_filter = env::var("BALLOT_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        if let Err(e) = EnvFilter::try_new(&log_filter) {
            return Err(ConfigError::InvalidLogFilter {
                value: log_filter,
                reason: e.to_string(),
            });
        }

        Ok(Self {
            database_url,
            max_connections,
            log_filter,
        })
    }

    /// Single-connection in-memory database, for tests and throwaway runs.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        }
    }
}
