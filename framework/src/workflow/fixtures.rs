//! Row builders for workflow tests

use crate::workflow::entities::{
    agents, custom_role_assignments, custom_roles, request_types, requests,
    workflow_template_steps, workflow_templates,
};
use crate::workflow::types::{StepRole, WorkflowDirection, WorkflowState};
use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn days_ago(days: i64) -> NaiveDateTime {
    now() - Duration::days(days)
}

pub async fn agent<C: ConnectionTrait>(
    conn: &C,
    user_id: Option<i64>,
    manager_id: Option<i64>,
) -> agents::Model {
    agents::ActiveModel {
        user_id: Set(user_id),
        last_name: Set("Rakoto".to_string()),
        first_name: Set(format!("Agent{}", user_id.unwrap_or_default())),
        manager_id: Set(manager_id),
        active: Set(true),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn role<C: ConnectionTrait>(conn: &C, code: &str) -> custom_roles::Model {
    custom_roles::ActiveModel {
        code: Set(code.to_string()),
        label: Set(format!("Role {}", code)),
        description: Set(None),
        active: Set(true),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn assignment<C: ConnectionTrait>(
    conn: &C,
    role_id: i64,
    agent_id: i64,
    starts_at: NaiveDateTime,
    ends_at: Option<NaiveDateTime>,
) -> custom_role_assignments::Model {
    custom_role_assignments::ActiveModel {
        custom_role_id: Set(role_id),
        agent_id: Set(agent_id),
        starts_at: Set(starts_at),
        ends_at: Set(ends_at),
        active: Set(true),
        created_at: Set(now()),
        created_by: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn template<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    direction: WorkflowDirection,
    roles: &[StepRole],
) -> workflow_templates::Model {
    let template = workflow_templates::ActiveModel {
        code: Set(code.to_string()),
        name: Set(format!("Template {}", code)),
        description: Set(None),
        direction: Set(direction.as_str().to_string()),
        icon: Set("📄".to_string()),
        color: Set("#3498db".to_string()),
        is_system: Set(false),
        active: Set(true),
        created_at: Set(now()),
        updated_at: Set(now()),
        created_by: Set(None),
        updated_by: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap();

    for (i, role) in roles.iter().enumerate() {
        step(conn, template.id, i as i32 + 1, role.clone(), true).await;
    }

    template
}

pub async fn step<C: ConnectionTrait>(
    conn: &C,
    template_id: i64,
    order_index: i32,
    role: StepRole,
    can_reject: bool,
) -> workflow_template_steps::Model {
    workflow_template_steps::ActiveModel {
        template_id: Set(template_id),
        order_index: Set(order_index),
        role_type: Set(role.role_type().to_string()),
        custom_role_name: Set(role.custom_code().map(str::to_string)),
        mandatory: Set(true),
        can_reject: Set(can_reject),
        deadline_days: Set(None),
        notify_email: Set(true),
        notify_sms: Set(false),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn request_type<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    template_id: i64,
    active: bool,
) -> request_types::Model {
    request_types::ActiveModel {
        code: Set(code.to_string()),
        label: Set(format!("Type {}", code)),
        description: Set(None),
        workflow_template_id: Set(template_id),
        category: Set("Other".to_string()),
        icon: Set(None),
        color: Set(None),
        form_schema: Set(None),
        document_required: Set(false),
        accepted_document_types: Set(None),
        needs_rh_validation: Set(false),
        needs_daf_validation: Set(false),
        is_system: Set(false),
        active: Set(active),
        display_order: Set(999),
        created_at: Set(now()),
        updated_at: Set(now()),
        created_by: Set(None),
        updated_by: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn request<C: ConnectionTrait>(
    conn: &C,
    type_code: &str,
    agent_id: i64,
    state: WorkflowState,
) -> requests::Model {
    requests::ActiveModel {
        type_code: Set(type_code.to_string()),
        agent_id: Set(agent_id),
        current_state: Set(state.as_str().to_string()),
        circuit_snapshot: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}
