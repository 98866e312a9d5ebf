//! Crate-wide error types
//!
//! Every fallible operation returns [`CircuitError`]. Variants are grouped by
//! [`ErrorKind`] so callers (an admin UI, an HTTP layer) can tell a missing
//! entity apart from a user-correctable conflict or a denied action.

use std::collections::HashMap;
use thiserror::Error;

/// Coarse error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unauthorized,
    Validation,
    Internal,
}

/// Input validation errors keyed by field
///
/// Contains a map of field names to error messages, supporting multiple
/// errors per field.
///
/// # Response Format
///
/// ```json
/// {
///     "message": "The given data was invalid.",
///     "errors": {
///         "code": ["The code must be between 1 and 50 characters."]
///     }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    /// Map of field names to their validation error messages
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error for a specific field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether a given field has at least one error
    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Convert from validator crate's ValidationErrors
    pub fn from_validator(errors: validator::ValidationErrors) -> Self {
        let mut result = Self::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation failed for field '{}'", field));
                result.add(field.to_string(), message);
            }
        }
        result
    }

    /// Turn a non-empty error set into `Err`
    pub fn into_result(self) -> Result<(), CircuitError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CircuitError::Validation(self))
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "message": "The given data was invalid.",
            "errors": self.errors
        })
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: {:?}", self.errors)
    }
}

impl std::error::Error for ValidationErrors {}

impl From<validator::ValidationErrors> for CircuitError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(ValidationErrors::from_validator(errors))
    }
}

/// Error type for the approval-circuit engine
///
/// `DbErr` converts automatically, so store helpers can use `?` directly:
///
/// ```rust,ignore
/// let template = workflow_templates::Entity::find_by_id(id)
///     .one(conn)
///     .await?
///     .ok_or_else(|| CircuitError::not_found("WorkflowTemplate", id))?;
/// ```
#[derive(Debug, Clone, Error)]
pub enum CircuitError {
    /// A referenced entity does not exist
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// A unique code is already taken
    #[error("{entity} with code '{code}' already exists")]
    DuplicateCode { entity: &'static str, code: String },

    /// Two steps of a template would share the same position
    #[error("Template {template_id} already has a step at position {order_index}")]
    DuplicateStepOrder { template_id: i64, order_index: i32 },

    /// The agent already holds the role through an active assignment
    #[error("Agent {agent_id} already holds role {role_id} (active assignment)")]
    AssignmentAlreadyActive { role_id: i64, agent_id: i64 },

    /// The template is still referenced by request types
    #[error("Template {template_id} is used by {count} request type(s)")]
    TemplateInUse { template_id: i64, count: usize },

    /// Under the `reject` tie-break a custom role has at most one holder
    #[error("Role '{role_code}' is already held by agent {holder_id}")]
    RoleAlreadyHeld { role_code: String, holder_id: i64 },

    /// A custom role is held by several agents and the tie-break policy rejects that
    #[error("Role '{role_code}' is held by {count} agents")]
    AmbiguousRoleHolder { role_code: String, count: usize },

    /// The requested state change is not the next step of the circuit
    #[error("Transition {from} -> {to} is not allowed")]
    TransitionNotAllowed { from: String, to: String },

    /// Structural modification of a built-in entity
    #[error("{entity} '{code}' is a system entity and cannot be modified")]
    SystemEntity { entity: &'static str, code: String },

    /// The acting user is not the validator the circuit expects
    #[error("This action must be performed by {expected}")]
    NotExpectedValidator { expected: String },

    /// Input validation errors
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Broken invariant or unexpected state
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CircuitError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn duplicate_code(entity: &'static str, code: impl Into<String>) -> Self {
        Self::DuplicateCode {
            entity,
            code: code.into(),
        }
    }

    pub fn system_entity(entity: &'static str, code: impl Into<String>) -> Self {
        Self::SystemEntity {
            entity,
            code: code.into(),
        }
    }

    /// Create a single-field validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Which class of failure this is
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateCode { .. }
            | Self::DuplicateStepOrder { .. }
            | Self::AssignmentAlreadyActive { .. }
            | Self::TemplateInUse { .. }
            | Self::AmbiguousRoleHolder { .. }
            | Self::RoleAlreadyHeld { .. }
            | Self::TransitionNotAllowed { .. } => ErrorKind::Conflict,
            Self::SystemEntity { .. } | Self::NotExpectedValidator { .. } => {
                ErrorKind::Unauthorized
            }
            Self::Validation(_) => ErrorKind::Validation,
            Self::Database(_) | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Unauthorized => 403,
            ErrorKind::Validation => 422,
            ErrorKind::Internal => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<sea_orm::DbErr> for CircuitError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<serde_json::Error> for CircuitError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", e))
    }
}

/// Whether a database error is a unique-constraint violation
pub(crate) fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}
