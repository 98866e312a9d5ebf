//! Display-oriented description of a template

use crate::workflow::entities::{workflow_template_steps, workflow_templates};
use crate::workflow::types::{StepRole, WorkflowDirection, WorkflowState};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStepKind {
    /// Synthetic first step of ascendant circuits
    Requester,
    Approval,
    /// Synthetic last step
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewStep {
    pub position: i32,
    pub kind: PreviewStepKind,
    pub role: Option<StepRole>,
    pub label: String,
    /// State the request enters once this step is done
    pub state: Option<WorkflowState>,
    pub mandatory: bool,
    pub can_reject: bool,
    pub deadline_days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowPreview {
    pub template_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub direction: WorkflowDirection,
    pub icon: String,
    pub color: String,
    pub steps: Vec<PreviewStep>,
}

/// Assemble a preview
///
/// `role_labels` maps custom role codes to their labels; unknown codes fall
/// back to the code itself. Steps malformed in storage are shown with their
/// raw role type.
pub fn build_preview(
    template: &workflow_templates::Model,
    direction: WorkflowDirection,
    steps: &[workflow_template_steps::Model],
    role_labels: &HashMap<String, String>,
) -> WorkflowPreview {
    let mut circuit = Vec::with_capacity(steps.len() + 2);

    if direction == WorkflowDirection::Ascendant {
        circuit.push(PreviewStep {
            position: 0,
            kind: PreviewStepKind::Requester,
            role: Some(StepRole::Requester),
            label: StepRole::Requester.label(),
            state: Some(WorkflowState::Submitted),
            mandatory: true,
            can_reject: false,
            deadline_days: None,
        });
    }

    for (index, step) in steps.iter().enumerate() {
        let role = step.role().ok();
        let label = match &role {
            Some(StepRole::Custom(code)) => {
                role_labels.get(code).cloned().unwrap_or_else(|| code.clone())
            }
            Some(role) => role.label(),
            None => step.role_type.clone(),
        };

        circuit.push(PreviewStep {
            position: step.order_index,
            kind: PreviewStepKind::Approval,
            role,
            label,
            state: WorkflowState::validation(index),
            mandatory: step.mandatory,
            can_reject: step.can_reject,
            deadline_days: step.deadline_days,
        });
    }

    let archive_position = steps.iter().map(|s| s.order_index).max().unwrap_or(0) + 1;
    circuit.push(PreviewStep {
        position: archive_position,
        kind: PreviewStepKind::Archive,
        role: None,
        label: "Archivage".to_string(),
        state: Some(WorkflowState::Archived),
        mandatory: true,
        can_reject: false,
        deadline_days: None,
    });

    WorkflowPreview {
        template_id: template.id,
        code: template.code.clone(),
        name: template.name.clone(),
        description: template.description.clone(),
        direction,
        icon: template.icon.clone(),
        color: template.color.clone(),
        steps: circuit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;
    use chrono::Utc;

    fn template(direction: WorkflowDirection) -> workflow_templates::Model {
        let now = Utc::now().naive_utc();
        workflow_templates::Model {
            id: 7,
            code: "CIRCUIT_BUDGET".into(),
            name: "Circuit budget".into(),
            description: None,
            direction: direction.as_str().into(),
            icon: "📄".into(),
            color: "#3498db".into(),
            is_system: false,
            active: true,
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
        }
    }

    fn step(order_index: i32, role: StepRole) -> workflow_template_steps::Model {
        let now = Utc::now().naive_utc();
        workflow_template_steps::Model {
            id: order_index as i64,
            template_id: 7,
            order_index,
            role_type: role.role_type().into(),
            custom_role_name: role.custom_code().map(Into::into),
            mandatory: true,
            can_reject: order_index == 1,
            deadline_days: Some(3),
            notify_email: true,
            notify_sms: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn ascendant_preview_is_framed_by_requester_and_archive() {
        let steps = vec![step(1, StepRole::NPlus1), step(2, StepRole::Custom("RESP_BUDGET".into()))];
        let labels = HashMap::from([("RESP_BUDGET".to_string(), "Responsable budget".to_string())]);

        let ascendant = WorkflowDirection::Ascendant;
        let preview = build_preview(&template(ascendant), ascendant, &steps, &labels);

        let kinds: Vec<PreviewStepKind> = preview.steps.iter().map(|s| s.kind).collect();
        expect!(kinds).to_equal(vec![
            PreviewStepKind::Requester,
            PreviewStepKind::Approval,
            PreviewStepKind::Approval,
            PreviewStepKind::Archive,
        ]);
        expect!(preview.steps[2].label.clone()).to_equal("Responsable budget".to_string());
        expect!(preview.steps[2].state).to_equal(Some(WorkflowState::ValidationN2));
        expect!(preview.steps[3].position).to_equal(3);
    }

    #[test]
    fn descendant_preview_has_no_requester_step() {
        let steps = vec![step(1, StepRole::Requester)];
        let preview = build_preview(
            &template(WorkflowDirection::Descendant),
            WorkflowDirection::Descendant,
            &steps,
            &HashMap::new(),
        );

        expect!(preview.steps.len()).to_equal(2);
        expect!(preview.steps[0].kind).to_equal(PreviewStepKind::Approval);
        expect!(preview.steps[0].label.clone()).to_equal("Demandeur (Agent)".to_string());
    }

    #[test]
    fn archive_comes_after_the_last_step_despite_gaps() {
        let steps = vec![step(1, StepRole::NPlus1), step(5, StepRole::Hr)];
        let ascendant = WorkflowDirection::Ascendant;
        let preview = build_preview(&template(ascendant), ascendant, &steps, &HashMap::new());

        let positions: Vec<i32> = preview.steps.iter().map(|s| s.position).collect();
        expect!(positions).to_equal(vec![0, 1, 5, 6]);
    }

    #[test]
    fn empty_template_archives_at_first_position() {
        let descendant = WorkflowDirection::Descendant;
        let preview = build_preview(&template(descendant), descendant, &[], &HashMap::new());

        expect!(preview.steps.len()).to_equal(1);
        expect!(preview.steps[0].position).to_equal(1);
    }
}
