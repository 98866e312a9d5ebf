//! Test helpers
//!
//! - `expect!` for fluent assertions with expected/received output
//! - `TestDatabase` for isolated in-memory databases
//!
//! ```rust,ignore
//! use circuit::expect;
//! use circuit::testing::TestDatabase;
//!
//! #[tokio::test]
//! async fn creates_a_role() {
//!     let db = TestDatabase::fresh::<Migrator>().await.unwrap();
//!     let service = WorkflowConfigService::with_connection(db.conn());
//!     let role = service.create_custom_role(new_role("RESP_BUDGET"), None).await.unwrap();
//!
//!     expect!(role.code).to_equal("RESP_BUDGET".to_string());
//! }
//! ```

mod expect;

pub use crate::database::testing::TestDatabase;
pub use expect::Expect;

/// Wrap a value for fluent assertions
#[macro_export]
macro_rules! expect {
    ($value:expr) => {
        $crate::testing::Expect::new($value, concat!(file!(), ":", line!()))
    };
}
