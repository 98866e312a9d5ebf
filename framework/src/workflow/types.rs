//! Workflow public types

use crate::error::CircuitError;
use serde::{Deserialize, Serialize};

/// Number of canonical validation slots; a circuit never has more levels
pub const MAX_VALIDATION_LEVELS: usize = 6;

/// Canonical request state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    #[serde(rename = "DRAFT")]
    Draft,
    #[serde(rename = "SUBMITTED")]
    Submitted,
    #[serde(rename = "VALIDATION_N1")]
    ValidationN1,
    #[serde(rename = "VALIDATION_N2")]
    ValidationN2,
    #[serde(rename = "VALIDATION_N3")]
    ValidationN3,
    #[serde(rename = "VALIDATION_N4")]
    ValidationN4,
    #[serde(rename = "VALIDATION_N5")]
    ValidationN5,
    #[serde(rename = "VALIDATION_N6")]
    ValidationN6,
    #[serde(rename = "ARCHIVED")]
    Archived,
    #[serde(rename = "REJECTED")]
    Rejected,
}

const VALIDATION_SLOTS: [WorkflowState; MAX_VALIDATION_LEVELS] = [
    WorkflowState::ValidationN1,
    WorkflowState::ValidationN2,
    WorkflowState::ValidationN3,
    WorkflowState::ValidationN4,
    WorkflowState::ValidationN5,
    WorkflowState::ValidationN6,
];

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::ValidationN1 => "VALIDATION_N1",
            Self::ValidationN2 => "VALIDATION_N2",
            Self::ValidationN3 => "VALIDATION_N3",
            Self::ValidationN4 => "VALIDATION_N4",
            Self::ValidationN5 => "VALIDATION_N5",
            Self::ValidationN6 => "VALIDATION_N6",
            Self::Archived => "ARCHIVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(Self::Draft),
            "SUBMITTED" => Some(Self::Submitted),
            "VALIDATION_N1" => Some(Self::ValidationN1),
            "VALIDATION_N2" => Some(Self::ValidationN2),
            "VALIDATION_N3" => Some(Self::ValidationN3),
            "VALIDATION_N4" => Some(Self::ValidationN4),
            "VALIDATION_N5" => Some(Self::ValidationN5),
            "VALIDATION_N6" => Some(Self::ValidationN6),
            "ARCHIVED" => Some(Self::Archived),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Parse a stored value; unknown values are a broken invariant
    pub fn parse(value: &str) -> Result<Self, CircuitError> {
        Self::from_str(value)
            .ok_or_else(|| CircuitError::internal(format!("Invalid workflow state '{}'", value)))
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Brouillon",
            Self::Submitted => "Soumis",
            Self::ValidationN1 => "Validation N+1",
            Self::ValidationN2 => "Validation N+2",
            Self::ValidationN3 => "Validation N+3",
            Self::ValidationN4 => "Validation N+4",
            Self::ValidationN5 => "Validation N+5",
            Self::ValidationN6 => "Validation N+6",
            Self::Archived => "Archivé",
            Self::Rejected => "Rejeté",
        }
    }

    /// Validation slot for a zero-based step index (0 -> N1 ... 5 -> N6)
    pub fn validation(index: usize) -> Option<Self> {
        VALIDATION_SLOTS.get(index).copied()
    }

    /// Zero-based step index of a validation state
    pub fn validation_index(&self) -> Option<usize> {
        VALIDATION_SLOTS.iter().position(|s| s == self)
    }

    /// Archived and rejected requests never move again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived | Self::Rejected)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who starts a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowDirection {
    /// Agent -> hierarchy (classic requests)
    #[serde(rename = "ASCENDANT")]
    Ascendant,
    /// Hierarchy -> agent (assigned tasks)
    #[serde(rename = "DESCENDANT")]
    Descendant,
}

impl WorkflowDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascendant => "ASCENDANT",
            Self::Descendant => "DESCENDANT",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CircuitError> {
        match value {
            "ASCENDANT" => Ok(Self::Ascendant),
            "DESCENDANT" => Ok(Self::Descendant),
            other => Err(CircuitError::internal(format!(
                "Invalid workflow direction '{}'",
                other
            ))),
        }
    }
}

/// Role required to approve a step
///
/// Stored as a `role_type` column plus a `custom_role_name` column that is
/// only set for [`StepRole::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code")]
pub enum StepRole {
    /// The request initiator
    #[serde(rename = "DEMANDEUR")]
    Requester,
    /// Direct manager
    #[serde(rename = "N_PLUS_1")]
    NPlus1,
    /// Manager's manager
    #[serde(rename = "N_PLUS_2")]
    NPlus2,
    #[serde(rename = "RH")]
    Hr,
    #[serde(rename = "DAF")]
    Daf,
    /// Administrator-defined role, by code
    #[serde(rename = "CUSTOM")]
    Custom(String),
}

impl StepRole {
    /// Value of the `role_type` column
    pub fn role_type(&self) -> &'static str {
        match self {
            Self::Requester => "DEMANDEUR",
            Self::NPlus1 => "N_PLUS_1",
            Self::NPlus2 => "N_PLUS_2",
            Self::Hr => "RH",
            Self::Daf => "DAF",
            Self::Custom(_) => "CUSTOM",
        }
    }

    /// Value of the `custom_role_name` column
    pub fn custom_code(&self) -> Option<&str> {
        match self {
            Self::Custom(code) => Some(code.as_str()),
            _ => None,
        }
    }

    /// Rebuild from stored columns
    pub fn from_columns(role_type: &str, custom_role_name: Option<&str>) -> Result<Self, CircuitError> {
        match role_type {
            "DEMANDEUR" => Ok(Self::Requester),
            "N_PLUS_1" => Ok(Self::NPlus1),
            "N_PLUS_2" => Ok(Self::NPlus2),
            "RH" => Ok(Self::Hr),
            "DAF" => Ok(Self::Daf),
            "CUSTOM" => match custom_role_name.map(str::trim) {
                Some(code) if !code.is_empty() => Ok(Self::Custom(code.to_string())),
                _ => Err(CircuitError::internal(
                    "CUSTOM step stored without a custom role name",
                )),
            },
            other => Err(CircuitError::internal(format!("Invalid role type '{}'", other))),
        }
    }

    /// Default display label
    pub fn label(&self) -> String {
        match self {
            Self::Requester => "Demandeur (Agent)".to_string(),
            Self::NPlus1 => "N+1".to_string(),
            Self::NPlus2 => "N+2".to_string(),
            Self::Hr => "RH".to_string(),
            Self::Daf => "DAF".to_string(),
            Self::Custom(code) => code.clone(),
        }
    }
}

/// Audit log action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Create,
    Update,
    Deactivate,
    Delete,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Deactivate => "DEACTIVATE",
            Self::Delete => "DELETE",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "DEACTIVATE" => Some(Self::Deactivate),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Configuration entity named in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEntity {
    Template,
    TemplateStep,
    RequestType,
    CustomRole,
    RoleAssignment,
}

impl ConfigEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "WorkflowTemplate",
            Self::TemplateStep => "WorkflowTemplateStep",
            Self::RequestType => "RequestTypeCustom",
            Self::CustomRole => "CustomRole",
            Self::RoleAssignment => "CustomRoleAssignment",
        }
    }
}
