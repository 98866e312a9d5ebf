//! Circuit: configurable approval workflows
//!
//! Approval circuits are configuration, not code. Templates list ordered
//! approval steps, request types bind to a template, custom roles name who
//! approves a step, and the resolver derives from all of that the states a
//! request walks through and who must act next.
//!
//! ```rust,ignore
//! use circuit::{Config, Resolver, DB};
//!
//! Config::init(std::path::Path::new("."));
//! DB::init().await?;
//!
//! let db = DB::connection()?;
//! let resolver = Resolver::new(db.inner());
//! let next = resolver.next_state(&request).await?;
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod testing;
pub mod workflow;

pub use config::{AppConfig, AppConfigBuilder, Config, Environment};
pub use database::{DatabaseConfig, DatabaseType, DbConnection, TestDatabase, DB};
pub use error::{CircuitError, ErrorKind, ValidationErrors};
pub use workflow::{
    build_circuit, system_templates, CircuitSnapshot, CircuitStep, ConfigEntity, HistoryAction,
    Migrator, NewCustomRole, NewRequestType, NewStep, NewTemplate, PreviewStep, PreviewStepKind,
    RequestTransitions, RequestTypeRegistry, Resolver, RoleDirectory, RoleHolder, RoleTieBreak,
    StepRole, SystemTemplate, TemplateUpdate, WorkflowConfig, WorkflowConfigService,
    WorkflowDirection, WorkflowPreview, WorkflowState, FALLBACK_CIRCUIT, MAX_VALIDATION_LEVELS,
};


// Re-export for the app crate and downstream entity code
pub use sea_orm;
pub use sea_orm_migration;
