//! Built-in system templates

use crate::workflow::types::{StepRole, WorkflowDirection};

/// Definition of a template created by `initialize_system_workflows`
#[derive(Debug, Clone)]
pub struct SystemTemplate {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub direction: WorkflowDirection,
    pub icon: &'static str,
    pub color: &'static str,
    pub roles: Vec<StepRole>,
}

pub fn system_templates() -> Vec<SystemTemplate> {
    vec![
        SystemTemplate {
            code: "CIRCUIT_LONG_RH",
            name: "Circuit Long (avec RH)",
            description: "Circuit complet : Agent → N+1 → N+2 → RH → DAF",
            direction: WorkflowDirection::Ascendant,
            icon: "📋",
            color: "#2ecc71",
            roles: vec![StepRole::NPlus1, StepRole::NPlus2, StepRole::Hr, StepRole::Daf],
        },
        SystemTemplate {
            code: "CIRCUIT_MOYEN",
            name: "Circuit Moyen (sans RH)",
            description: "Circuit : Agent → N+1 → N+2",
            direction: WorkflowDirection::Ascendant,
            icon: "📄",
            color: "#3498db",
            roles: vec![StepRole::NPlus1, StepRole::NPlus2],
        },
        SystemTemplate {
            code: "TACHE_DESCENDANTE",
            name: "Tâche Descendante",
            description: "Tâche assignée par un supérieur qui se termine au demandeur",
            direction: WorkflowDirection::Descendant,
            icon: "⬇️",
            color: "#e74c3c",
            roles: vec![StepRole::Requester],
        },
    ]
}
