//! Isolated databases for tests

use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;

use crate::database::{DbConnection, TEST_CONNECTION};
use crate::error::CircuitError;

/// In-memory SQLite database with migrations applied
///
/// The pool is capped at one connection so every query sees the same
/// in-memory database. While the value lives, `DB::connection()` on this
/// thread returns it.
///
/// ```rust,ignore
/// let db = TestDatabase::fresh::<Migrator>().await?;
/// let service = WorkflowConfigService::with_connection(db.conn());
/// ```
pub struct TestDatabase {
    conn: DbConnection,
}

impl TestDatabase {
    /// Create an empty database and run every migration of `M`
    pub async fn fresh<M: MigratorTrait>() -> Result<Self, CircuitError> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);

        let inner = Database::connect(opt).await?;
        M::up(&inner, None).await?;

        let conn = DbConnection::from_inner(inner);
        TEST_CONNECTION.with(|c| *c.borrow_mut() = Some(conn.clone()));

        Ok(Self { conn })
    }

    pub fn conn(&self) -> DbConnection {
        self.conn.clone()
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        TEST_CONNECTION.with(|c| *c.borrow_mut() = None);
    }
}
