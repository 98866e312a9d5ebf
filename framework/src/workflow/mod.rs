//! Configurable approval circuits
//!
//! Administrators describe approval circuits as data: templates made of
//! ordered steps, each step naming who must approve (the requester, the
//! management chain, RH, DAF or an administrator-defined custom role). Request
//! types bind to a template, and the resolver turns that configuration into
//! the state circuit a request walks through.
//!
//! # Example
//!
//! ```rust,ignore
//! use circuit::{NewStep, NewTemplate, NewRequestType, Resolver, StepRole, WorkflowConfigService};
//!
//! let service = WorkflowConfigService::new()?;
//! let template = service
//!     .create_template(NewTemplate::new("CIRCUIT_BUDGET", "Circuit budget"), Some(admin))
//!     .await?;
//! service.add_step(template.id, NewStep::new(StepRole::NPlus1, 1), Some(admin)).await?;
//! service
//!     .add_step(template.id, NewStep::new(StepRole::Custom("RESP_BUDGET".into()), 2), Some(admin))
//!     .await?;
//! service
//!     .create_request_type(NewRequestType::new("ACHAT", "Demande d'achat", template.id), Some(admin))
//!     .await?;
//!
//! // Read side
//! let db = DB::connection()?;
//! let resolver = Resolver::new(db.inner());
//! let circuit = resolver.circuit(&request).await?;
//! let pending = resolver.pending_requests_for_user(user_id).await?;
//! ```
//!
//! Schema: run [`Migrator`] (`app migrate`) before using any of the above.

pub mod audit;
pub mod config;
pub mod entities;
pub mod hierarchy;
pub mod inputs;
pub mod migrations;
pub mod preview;
pub mod registry;
pub mod resolver;
pub mod roles;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod system;
pub mod transitions;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use config::{RoleTieBreak, WorkflowConfig};
pub use inputs::{NewCustomRole, NewRequestType, NewStep, NewTemplate, TemplateUpdate};
pub use migrations::Migrator;
pub use preview::{PreviewStep, PreviewStepKind, WorkflowPreview};
pub use registry::RequestTypeRegistry;
pub use resolver::{build_circuit, Resolver, FALLBACK_CIRCUIT};
pub use roles::{RoleDirectory, RoleHolder};
pub use service::WorkflowConfigService;
pub use snapshot::{CircuitSnapshot, CircuitStep};
pub use system::{system_templates, SystemTemplate};
pub use transitions::RequestTransitions;
pub use types::{
    ConfigEntity, HistoryAction, StepRole, WorkflowDirection, WorkflowState, MAX_VALIDATION_LEVELS,
};
