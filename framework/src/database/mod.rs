//! Database access
//!
//! SeaORM connection pool held behind the [`DB`] facade.
//!
//! ```rust,ignore
//! use circuit::{Config, DB};
//!
//! Config::init(std::path::Path::new("."));
//! DB::init().await?;
//!
//! let conn = DB::connection()?;
//! ```
//!
//! Tests use [`TestDatabase`], which installs a thread-local connection that
//! shadows the global one for the duration of the test.

pub mod config;
pub mod connection;
pub mod testing;

pub use config::{DatabaseConfig, DatabaseConfigBuilder, DatabaseType};
pub use connection::DbConnection;
pub use testing::TestDatabase;

use crate::config::Config;
use crate::error::CircuitError;
use std::cell::RefCell;
use std::sync::{OnceLock, RwLock};

static GLOBAL_CONNECTION: OnceLock<RwLock<Option<DbConnection>>> = OnceLock::new();

thread_local! {
    pub(crate) static TEST_CONNECTION: RefCell<Option<DbConnection>> = const { RefCell::new(None) };
}

/// Database facade
pub struct DB;

impl DB {
    /// Connect using the registered `DatabaseConfig`, or one read from the environment
    pub async fn init() -> Result<(), CircuitError> {
        let config = Config::get::<DatabaseConfig>().unwrap_or_else(DatabaseConfig::from_env);
        Self::init_with(config).await
    }

    /// Connect with an explicit config
    pub async fn init_with(config: DatabaseConfig) -> Result<(), CircuitError> {
        let connection = DbConnection::connect(&config).await?;
        Self::install(connection);
        Ok(())
    }

    /// Replace the process-wide connection
    pub fn install(connection: DbConnection) {
        let slot = GLOBAL_CONNECTION.get_or_init(|| RwLock::new(None));
        if let Ok(mut slot) = slot.write() {
            *slot = Some(connection);
        }
    }

    /// Current connection, preferring a test override on this thread
    ///
    /// # Errors
    ///
    /// Returns an internal error if neither `DB::init()` nor a `TestDatabase`
    /// provided a connection.
    pub fn connection() -> Result<DbConnection, CircuitError> {
        if let Some(conn) = TEST_CONNECTION.with(|c| c.borrow().clone()) {
            return Ok(conn);
        }

        GLOBAL_CONNECTION
            .get()
            .and_then(|slot| slot.read().ok())
            .and_then(|slot| slot.clone())
            .ok_or_else(|| {
                CircuitError::internal("Database not initialized. Call DB::init() first.")
            })
    }

    pub fn is_connected() -> bool {
        Self::connection().is_ok()
    }
}

pub use sea_orm;
