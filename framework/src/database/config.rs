//! Database configuration

use crate::config::env::{env, env_flag};

/// Backend detected from the connection URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Sqlite,
    Postgres,
}

impl DatabaseType {
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("sqlite:") {
            Some(Self::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else {
            None
        }
    }
}

/// Database configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL` - Connection URL (default: `sqlite://./circuit.db`)
/// - `DB_MAX_CONNECTIONS` - Pool size (default: 10)
/// - `DB_MIN_CONNECTIONS` - Idle connections kept open (default: 1)
/// - `DB_CONNECT_TIMEOUT` - Connect timeout in seconds (default: 30)
/// - `DB_LOGGING` - Log every SQL statement (default: false)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds
    pub connect_timeout: u64,
    pub logging: bool,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env("DATABASE_URL", "sqlite://./circuit.db".to_string()),
            max_connections: env("DB_MAX_CONNECTIONS", 10u32),
            min_connections: env("DB_MIN_CONNECTIONS", 1u32),
            connect_timeout: env("DB_CONNECT_TIMEOUT", 30u64),
            logging: env_flag("DB_LOGGING", false),
        }
    }

    pub fn builder() -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::default()
    }

    pub fn database_type(&self) -> Option<DatabaseType> {
        DatabaseType::from_url(&self.url)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Builder for DatabaseConfig
#[derive(Default)]
pub struct DatabaseConfigBuilder {
    url: Option<String>,
    max_connections: Option<u32>,
    min_connections: Option<u32>,
    connect_timeout: Option<u64>,
    logging: Option<bool>,
}

impl DatabaseConfigBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = Some(n);
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = Some(n);
        self
    }

    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = Some(secs);
        self
    }

    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = Some(enabled);
        self
    }

    pub fn build(self) -> DatabaseConfig {
        let default = DatabaseConfig::from_env();
        DatabaseConfig {
            url: self.url.unwrap_or(default.url),
            max_connections: self.max_connections.unwrap_or(default.max_connections),
            min_connections: self.min_connections.unwrap_or(default.min_connections),
            connect_timeout: self.connect_timeout.unwrap_or(default.connect_timeout),
            logging: self.logging.unwrap_or(default.logging),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;

    #[test]
    fn detects_backend_from_url() {
        expect!(DatabaseType::from_url("sqlite::memory:")).to_equal(Some(DatabaseType::Sqlite));
        expect!(DatabaseType::from_url("postgres://u:p@localhost/db"))
            .to_equal(Some(DatabaseType::Postgres));
        expect!(DatabaseType::from_url("mysql://localhost")).to_be_none();
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = DatabaseConfig::builder()
            .url("sqlite::memory:")
            .max_connections(1)
            .build();
        expect!(config.url).to_equal("sqlite::memory:".to_string());
        expect!(config.max_connections).to_equal(1);
    }
}
