//! Circuit steps and frozen circuit snapshots
//!
//! A request that has been submitted keeps a copy of the step list it was
//! submitted under. Later edits to the template do not change the meaning of
//! its `VALIDATION_Nk` states.

use crate::error::CircuitError;
use crate::workflow::entities::{workflow_template_steps, workflow_templates};
use crate::workflow::types::StepRole;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One approval level of a circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitStep {
    pub order_index: i32,
    pub role: StepRole,
    pub mandatory: bool,
    pub can_reject: bool,
    pub deadline_days: Option<i32>,
}

impl CircuitStep {
    pub fn from_model(step: &workflow_template_steps::Model) -> Result<Self, CircuitError> {
        Ok(Self {
            order_index: step.order_index,
            role: step.role()?,
            mandatory: step.mandatory,
            can_reject: step.can_reject,
            deadline_days: step.deadline_days,
        })
    }
}

/// Step list copied into a request at submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub template_id: i64,
    pub template_code: String,
    pub frozen_at: NaiveDateTime,
    pub steps: Vec<CircuitStep>,
}

impl CircuitSnapshot {
    pub fn capture(
        template: &workflow_templates::Model,
        steps: Vec<CircuitStep>,
        frozen_at: NaiveDateTime,
    ) -> Self {
        Self {
            template_id: template.id,
            template_code: template.code.clone(),
            frozen_at,
            steps,
        }
    }

    pub fn encode(&self) -> Result<String, CircuitError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, CircuitError> {
        serde_json::from_str(raw)
            .map_err(|e| CircuitError::internal(format!("Corrupt circuit snapshot: {}", e)))
    }
}
