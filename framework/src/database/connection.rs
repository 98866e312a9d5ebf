//! Database connection management

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::database::config::DatabaseConfig;
use crate::error::CircuitError;

/// Clonable handle to a SeaORM connection pool
///
/// ```rust,ignore
/// let conn = DbConnection::connect(&config).await?;
/// let templates = workflow_templates::Entity::find().all(conn.inner()).await?;
/// ```
#[derive(Clone)]
pub struct DbConnection {
    inner: Arc<DatabaseConnection>,
}

impl DbConnection {
    /// Open a pool from config
    ///
    /// File-backed SQLite URLs get their parent directory created and are
    /// opened in create mode.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, CircuitError> {
        let url = normalize_sqlite_url(&config.url);

        let mut opt = ConnectOptions::new(&url);
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .sqlx_logging(config.logging);

        let conn = Database::connect(opt)
            .await
            .map_err(|e| CircuitError::database(e.to_string()))?;

        tracing::debug!(url = %redact(&url), "database pool opened");

        Ok(Self::from_inner(conn))
    }

    /// Wrap an already-open SeaORM connection
    pub fn from_inner(conn: DatabaseConnection) -> Self {
        Self {
            inner: Arc::new(conn),
        }
    }

    /// Underlying SeaORM connection
    pub fn inner(&self) -> &DatabaseConnection {
        &self.inner
    }
}

impl AsRef<DatabaseConnection> for DbConnection {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.inner
    }
}

impl std::ops::Deref for DbConnection {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

fn normalize_sqlite_url(url: &str) -> String {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return url.to_string();
    };
    let path = path.trim_start_matches("./");

    if path.starts_with(":memory:") {
        return url.to_string();
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    format!("sqlite:{}?mode=rwc", path)
}

/// Hide credentials before logging a URL
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;

    #[test]
    fn memory_urls_are_untouched() {
        expect!(normalize_sqlite_url("sqlite::memory:")).to_equal("sqlite::memory:".to_string());
        expect!(normalize_sqlite_url("postgres://localhost/db"))
            .to_equal("postgres://localhost/db".to_string());
    }

    #[test]
    fn credentials_are_redacted() {
        expect!(redact("postgres://admin:secret@db:5432/circuit"))
            .to_equal("postgres://***@db:5432/circuit".to_string());
    }
}
