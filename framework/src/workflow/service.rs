//! Configuration mutation service
//!
//! The only writer of templates, steps, request types, custom roles and role
//! assignments. Each operation is one unit of work: it runs in its own
//! transaction together with its audit entry, and an error anywhere drops the
//! transaction, which rolls everything back.
//!
//! Built-in (`is_system`) templates and request types may be referenced but
//! not structurally modified.
//!
//! ```rust,ignore
//! let service = WorkflowConfigService::new()?;
//!
//! let template = service
//!     .create_template(NewTemplate::new("CIRCUIT_BUDGET", "Circuit budget"), Some(admin_id))
//!     .await?;
//! service
//!     .add_step(template.id, NewStep::new(StepRole::Custom("RESP_BUDGET".into()), 1), Some(admin_id))
//!     .await?;
//! ```

use crate::config::{AppConfig, Config};
use crate::database::{DbConnection, DB};
use crate::error::{is_unique_violation, CircuitError};
use crate::workflow::audit;
use crate::workflow::config::{RoleTieBreak, WorkflowConfig};
use crate::workflow::roles::RoleDirectory;
use crate::workflow::entities::{
    custom_role_assignments, custom_roles, request_types, workflow_config_history,
    workflow_template_steps, workflow_templates,
};
use crate::workflow::inputs::{NewCustomRole, NewRequestType, NewStep, NewTemplate, TemplateUpdate};
use crate::workflow::preview::{build_preview, WorkflowPreview};
use crate::workflow::store;
use crate::workflow::system::system_templates;
use crate::workflow::types::{ConfigEntity, HistoryAction, StepRole, MAX_VALIDATION_LEVELS};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use validator::Validate;

pub struct WorkflowConfigService {
    db: DbConnection,
    config: WorkflowConfig,
    system_actor_id: i64,
}

impl WorkflowConfigService {
    /// Service over the current `DB` connection
    pub fn new() -> Result<Self, CircuitError> {
        Ok(Self::with_connection(DB::connection()?))
    }

    pub fn with_connection(db: DbConnection) -> Self {
        let system_actor_id = Config::get::<AppConfig>()
            .map(|c| c.system_actor_id)
            .unwrap_or_default();

        Self {
            db,
            config: WorkflowConfig::current(),
            system_actor_id,
        }
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn connection(&self) -> &DbConnection {
        &self.db
    }

    fn actor(&self, actor: Option<i64>) -> i64 {
        actor.unwrap_or(self.system_actor_id)
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    pub async fn create_template(
        &self,
        input: NewTemplate,
        actor: Option<i64>,
    ) -> Result<workflow_templates::Model, CircuitError> {
        input.validate()?;
        let txn = self.db.inner().begin().await?;

        let template = insert_template(&txn, &input, false, actor).await?;
        audit::record(
            &txn,
            ConfigEntity::Template,
            template.id,
            HistoryAction::Create,
            Some(json!({
                "code": template.code,
                "name": template.name,
                "direction": template.direction,
            })),
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(template_id = template.id, code = %template.code, "workflow template created");
        Ok(template)
    }

    /// Rename or restyle a template
    ///
    /// Only changed fields are written and audited; an update that changes
    /// nothing writes nothing.
    pub async fn update_template(
        &self,
        template_id: i64,
        update: TemplateUpdate,
        actor: Option<i64>,
    ) -> Result<workflow_templates::Model, CircuitError> {
        update.validate()?;
        let txn = self.db.inner().begin().await?;

        let template = store::get_template(&txn, template_id).await?;
        ensure_not_system(&template)?;

        let mut changes = serde_json::Map::new();
        let mut active: workflow_templates::ActiveModel = template.clone().into();

        if let Some(name) = update.name.filter(|n| *n != template.name) {
            changes.insert("name".into(), json!({"old": template.name, "new": name}));
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            let description = Some(description).filter(|d| !d.trim().is_empty());
            if description != template.description {
                changes.insert(
                    "description".into(),
                    json!({"old": template.description, "new": description}),
                );
                active.description = Set(description);
            }
        }
        if let Some(direction) = update.direction.filter(|d| d.as_str() != template.direction) {
            changes.insert(
                "direction".into(),
                json!({"old": template.direction, "new": direction.as_str()}),
            );
            active.direction = Set(direction.as_str().to_string());
        }
        if let Some(icon) = update.icon.filter(|i| *i != template.icon) {
            changes.insert("icon".into(), json!({"old": template.icon, "new": icon}));
            active.icon = Set(icon);
        }
        if let Some(color) = update.color.filter(|c| *c != template.color) {
            changes.insert("color".into(), json!({"old": template.color, "new": color}));
            active.color = Set(color);
        }

        if changes.is_empty() {
            return Ok(template);
        }

        active.updated_at = Set(Utc::now().naive_utc());
        active.updated_by = Set(actor);
        let updated = active.update(&txn).await?;

        audit::record(
            &txn,
            ConfigEntity::Template,
            updated.id,
            HistoryAction::Update,
            Some(serde_json::Value::Object(changes)),
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(template_id = updated.id, "workflow template updated");
        Ok(updated)
    }

    /// Soft-delete a template
    ///
    /// Refused while an active request type still points at it.
    pub async fn retire_template(
        &self,
        template_id: i64,
        actor: Option<i64>,
    ) -> Result<workflow_templates::Model, CircuitError> {
        let txn = self.db.inner().begin().await?;

        let template = store::get_template(&txn, template_id).await?;
        ensure_not_system(&template)?;

        let count = store::count_request_types_for_template(&txn, template.id, true).await?;
        if count > 0 {
            return Err(CircuitError::TemplateInUse { template_id, count });
        }

        let mut active: workflow_templates::ActiveModel = template.into();
        active.active = Set(false);
        active.updated_at = Set(Utc::now().naive_utc());
        active.updated_by = Set(actor);
        let retired = active.update(&txn).await?;

        audit::record(
            &txn,
            ConfigEntity::Template,
            retired.id,
            HistoryAction::Deactivate,
            None,
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(template_id = retired.id, code = %retired.code, "workflow template retired");
        Ok(retired)
    }

    /// Delete a template and its steps
    ///
    /// Refused while any request type, active or retired, references it. The
    /// audit entry is written before the rows go.
    pub async fn purge_template(&self, template_id: i64, actor: Option<i64>) -> Result<(), CircuitError> {
        let txn = self.db.inner().begin().await?;

        let template = store::get_template(&txn, template_id).await?;
        ensure_not_system(&template)?;

        let count = store::count_request_types_for_template(&txn, template.id, false).await?;
        if count > 0 {
            return Err(CircuitError::TemplateInUse { template_id, count });
        }

        audit::record(
            &txn,
            ConfigEntity::Template,
            template.id,
            HistoryAction::Delete,
            Some(json!({"code": template.code, "name": template.name})),
            self.actor(actor),
        )
        .await?;

        workflow_template_steps::Entity::delete_many()
            .filter(workflow_template_steps::Column::TemplateId.eq(template.id))
            .exec(&txn)
            .await?;
        workflow_templates::Entity::delete_by_id(template.id)
            .exec(&txn)
            .await?;

        txn.commit().await?;
        tracing::info!(template_id, code = %template.code, "workflow template purged");
        Ok(())
    }

    pub async fn find_template_by_code(
        &self,
        code: &str,
    ) -> Result<Option<workflow_templates::Model>, CircuitError> {
        store::find_template_by_code(self.db.inner(), code).await
    }

    /// Templates, system ones first, then by name
    pub async fn list_templates(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<workflow_templates::Model>, CircuitError> {
        let mut query = workflow_templates::Entity::find();
        if !include_inactive {
            query = query.filter(workflow_templates::Column::Active.eq(true));
        }
        Ok(query
            .order_by_desc(workflow_templates::Column::IsSystem)
            .order_by_asc(workflow_templates::Column::Name)
            .all(self.db.inner())
            .await?)
    }

    /// Steps of an existing template, in order
    pub async fn template_steps(
        &self,
        template_id: i64,
    ) -> Result<Vec<workflow_template_steps::Model>, CircuitError> {
        store::get_template(self.db.inner(), template_id).await?;
        store::template_steps(self.db.inner(), template_id).await
    }

    // ------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------

    /// Append a step to a template
    ///
    /// The position must be free within the template. A seventh step is
    /// accepted but has no validation level and never becomes part of a
    /// circuit. CUSTOM steps may name a role that does not exist yet.
    pub async fn add_step(
        &self,
        template_id: i64,
        input: NewStep,
        actor: Option<i64>,
    ) -> Result<workflow_template_steps::Model, CircuitError> {
        input.validate()?;
        let txn = self.db.inner().begin().await?;

        let template = store::get_template(&txn, template_id).await?;
        ensure_not_system(&template)?;

        let step = insert_step(&txn, template.id, &input).await?;
        audit::record(
            &txn,
            ConfigEntity::TemplateStep,
            step.id,
            HistoryAction::Create,
            Some(step_changes(&step)),
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(
            template_id,
            step_id = step.id,
            order_index = step.order_index,
            role = %step.role_type,
            "workflow step added"
        );
        Ok(step)
    }

    pub async fn remove_step(&self, step_id: i64, actor: Option<i64>) -> Result<(), CircuitError> {
        let txn = self.db.inner().begin().await?;

        let step = workflow_template_steps::Entity::find_by_id(step_id)
            .one(&txn)
            .await?
            .ok_or_else(|| CircuitError::not_found("WorkflowTemplateStep", step_id))?;
        let template = store::get_template(&txn, step.template_id).await?;
        ensure_not_system(&template)?;

        audit::record(
            &txn,
            ConfigEntity::TemplateStep,
            step.id,
            HistoryAction::Delete,
            Some(step_changes(&step)),
            self.actor(actor),
        )
        .await?;
        workflow_template_steps::Entity::delete_by_id(step.id)
            .exec(&txn)
            .await?;

        txn.commit().await?;
        tracing::info!(template_id = template.id, step_id, "workflow step removed");
        Ok(())
    }

    /// Replace every step of a template at once
    pub async fn replace_steps(
        &self,
        template_id: i64,
        steps: Vec<NewStep>,
        actor: Option<i64>,
    ) -> Result<Vec<workflow_template_steps::Model>, CircuitError> {
        for step in &steps {
            step.validate()?;
        }
        let mut seen = HashSet::new();
        if let Some(dup) = steps.iter().find(|s| !seen.insert(s.order_index)) {
            return Err(CircuitError::DuplicateStepOrder {
                template_id,
                order_index: dup.order_index,
            });
        }

        let txn = self.db.inner().begin().await?;
        let template = store::get_template(&txn, template_id).await?;
        ensure_not_system(&template)?;

        let previous = store::template_steps(&txn, template.id).await?;
        workflow_template_steps::Entity::delete_many()
            .filter(workflow_template_steps::Column::TemplateId.eq(template.id))
            .exec(&txn)
            .await?;

        let mut inserted = Vec::with_capacity(steps.len());
        for step in &steps {
            inserted.push(insert_step(&txn, template.id, step).await?);
        }
        inserted.sort_by_key(|s| s.order_index);

        audit::record(
            &txn,
            ConfigEntity::Template,
            template.id,
            HistoryAction::Update,
            Some(json!({
                "steps": {
                    "old": previous.iter().map(step_changes).collect::<Vec<_>>(),
                    "new": inserted.iter().map(step_changes).collect::<Vec<_>>(),
                }
            })),
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(template_id, steps = inserted.len(), "workflow steps replaced");
        Ok(inserted)
    }

    // ------------------------------------------------------------------
    // Request types
    // ------------------------------------------------------------------

    pub async fn create_request_type(
        &self,
        input: NewRequestType,
        actor: Option<i64>,
    ) -> Result<request_types::Model, CircuitError> {
        input.validate()?;
        let form_schema = input
            .form_schema
            .as_ref()
            .map(encode_form_schema)
            .transpose()?;

        let txn = self.db.inner().begin().await?;

        if store::find_request_type_by_code(&txn, &input.code).await?.is_some() {
            return Err(CircuitError::duplicate_code("RequestType", input.code));
        }
        store::get_template(&txn, input.workflow_template_id).await?;

        let now = Utc::now().naive_utc();
        let request_type = request_types::ActiveModel {
            code: Set(input.code.clone()),
            label: Set(input.label),
            description: Set(input.description),
            workflow_template_id: Set(input.workflow_template_id),
            category: Set(input.category),
            icon: Set(input.icon),
            color: Set(input.color),
            form_schema: Set(form_schema),
            document_required: Set(input.document_required),
            accepted_document_types: Set(input.accepted_document_types),
            needs_rh_validation: Set(input.needs_rh_validation),
            needs_daf_validation: Set(input.needs_daf_validation),
            is_system: Set(false),
            active: Set(true),
            display_order: Set(input.display_order),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(actor),
            updated_by: Set(actor),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CircuitError::duplicate_code("RequestType", input.code.clone())
            } else {
                e.into()
            }
        })?;

        audit::record(
            &txn,
            ConfigEntity::RequestType,
            request_type.id,
            HistoryAction::Create,
            Some(json!({
                "code": request_type.code,
                "workflow_template_id": request_type.workflow_template_id,
            })),
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(
            request_type_id = request_type.id,
            code = %request_type.code,
            template_id = request_type.workflow_template_id,
            "request type created"
        );
        Ok(request_type)
    }

    pub async fn retire_request_type(
        &self,
        request_type_id: i64,
        actor: Option<i64>,
    ) -> Result<request_types::Model, CircuitError> {
        let txn = self.db.inner().begin().await?;

        let request_type = store::find_request_type(&txn, request_type_id)
            .await?
            .ok_or_else(|| CircuitError::not_found("RequestType", request_type_id))?;
        if request_type.is_system {
            return Err(CircuitError::system_entity("RequestType", request_type.code));
        }

        let mut active: request_types::ActiveModel = request_type.into();
        active.active = Set(false);
        active.updated_at = Set(Utc::now().naive_utc());
        active.updated_by = Set(actor);
        let retired = active.update(&txn).await?;

        audit::record(
            &txn,
            ConfigEntity::RequestType,
            retired.id,
            HistoryAction::Deactivate,
            None,
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(request_type_id, code = %retired.code, "request type retired");
        Ok(retired)
    }

    // ------------------------------------------------------------------
    // Custom roles
    // ------------------------------------------------------------------

    pub async fn create_custom_role(
        &self,
        input: NewCustomRole,
        actor: Option<i64>,
    ) -> Result<custom_roles::Model, CircuitError> {
        input.validate()?;
        let txn = self.db.inner().begin().await?;

        if store::find_custom_role_by_code(&txn, &input.code).await?.is_some() {
            return Err(CircuitError::duplicate_code("CustomRole", input.code));
        }

        let now = Utc::now().naive_utc();
        let role = custom_roles::ActiveModel {
            code: Set(input.code.clone()),
            label: Set(input.label),
            description: Set(input.description),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CircuitError::duplicate_code("CustomRole", input.code.clone())
            } else {
                e.into()
            }
        })?;

        audit::record(
            &txn,
            ConfigEntity::CustomRole,
            role.id,
            HistoryAction::Create,
            Some(json!({"code": role.code, "label": role.label})),
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(role_id = role.id, code = %role.code, "custom role created");
        Ok(role)
    }

    /// Deactivate a role; its holders stop resolving immediately
    pub async fn retire_custom_role(
        &self,
        role_id: i64,
        actor: Option<i64>,
    ) -> Result<custom_roles::Model, CircuitError> {
        let txn = self.db.inner().begin().await?;

        let role = store::find_custom_role(&txn, role_id)
            .await?
            .ok_or_else(|| CircuitError::not_found("CustomRole", role_id))?;

        let mut active: custom_roles::ActiveModel = role.into();
        active.active = Set(false);
        active.updated_at = Set(Utc::now().naive_utc());
        let retired = active.update(&txn).await?;

        audit::record(
            &txn,
            ConfigEntity::CustomRole,
            retired.id,
            HistoryAction::Deactivate,
            None,
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(role_id, code = %retired.code, "custom role retired");
        Ok(retired)
    }

    /// Delete a role together with all of its assignments
    pub async fn purge_custom_role(&self, role_id: i64, actor: Option<i64>) -> Result<(), CircuitError> {
        let txn = self.db.inner().begin().await?;

        let role = store::find_custom_role(&txn, role_id)
            .await?
            .ok_or_else(|| CircuitError::not_found("CustomRole", role_id))?;

        let assignments = custom_role_assignments::Entity::find()
            .filter(custom_role_assignments::Column::CustomRoleId.eq(role.id))
            .all(&txn)
            .await?;

        audit::record(
            &txn,
            ConfigEntity::CustomRole,
            role.id,
            HistoryAction::Delete,
            Some(json!({
                "code": role.code,
                "label": role.label,
                "assignments": assignments.iter().map(|a| a.agent_id).collect::<Vec<_>>(),
            })),
            self.actor(actor),
        )
        .await?;

        custom_role_assignments::Entity::delete_many()
            .filter(custom_role_assignments::Column::CustomRoleId.eq(role.id))
            .exec(&txn)
            .await?;
        custom_roles::Entity::delete_by_id(role.id).exec(&txn).await?;

        txn.commit().await?;
        tracing::info!(
            role_id,
            code = %role.code,
            assignments = assignments.len(),
            "custom role purged"
        );
        Ok(())
    }

    /// Custom roles ordered by code
    pub async fn list_custom_roles(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<custom_roles::Model>, CircuitError> {
        let mut query = custom_roles::Entity::find();
        if !include_inactive {
            query = query.filter(custom_roles::Column::Active.eq(true));
        }
        Ok(query
            .order_by_asc(custom_roles::Column::Code)
            .all(self.db.inner())
            .await?)
    }

    // ------------------------------------------------------------------
    // Role assignments
    // ------------------------------------------------------------------

    /// Give a role to an agent from now until `ends_at` (open-ended if `None`)
    ///
    /// A pair holds at most one active assignment. An active one that has
    /// already expired is closed here so the role can be granted again; the
    /// partial unique index on `(custom_role_id, agent_id) WHERE active`
    /// settles concurrent grants.
    pub async fn assign_role(
        &self,
        role_id: i64,
        agent_id: i64,
        ends_at: Option<NaiveDateTime>,
        actor: Option<i64>,
    ) -> Result<custom_role_assignments::Model, CircuitError> {
        let now = Utc::now().naive_utc();
        if ends_at.is_some_and(|end| end <= now) {
            return Err(CircuitError::validation("ends_at", "End date must be in the future"));
        }

        let txn = self.db.inner().begin().await?;

        let role = store::find_custom_role(&txn, role_id)
            .await?
            .ok_or_else(|| CircuitError::not_found("CustomRole", role_id))?;
        store::find_agent(&txn, agent_id)
            .await?
            .ok_or_else(|| CircuitError::not_found("Agent", agent_id))?;

        let existing = custom_role_assignments::Entity::find()
            .filter(custom_role_assignments::Column::CustomRoleId.eq(role.id))
            .filter(custom_role_assignments::Column::AgentId.eq(agent_id))
            .filter(custom_role_assignments::Column::Active.eq(true))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            if existing.ends_at.map_or(true, |end| end > now) {
                return Err(CircuitError::AssignmentAlreadyActive { role_id, agent_id });
            }
            let mut expired: custom_role_assignments::ActiveModel = existing.into();
            expired.active = Set(false);
            expired.update(&txn).await?;
        }

        if self.config.role_tie_break == RoleTieBreak::Reject {
            let holders = RoleDirectory::with_tie_break(&txn, RoleTieBreak::Reject)
                .holders_at(&role.code, now)
                .await?;
            if let Some(other) = holders.iter().find(|h| h.agent.id != agent_id) {
                return Err(CircuitError::RoleAlreadyHeld {
                    role_code: role.code,
                    holder_id: other.agent.id,
                });
            }
        }

        let assignment = insert_assignment(&txn, role.id, agent_id, now, ends_at, actor).await?;

        audit::record(
            &txn,
            ConfigEntity::RoleAssignment,
            assignment.id,
            HistoryAction::Create,
            Some(json!({
                "custom_role_id": role.id,
                "role_code": role.code,
                "agent_id": agent_id,
                "ends_at": ends_at,
            })),
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(role = %role.code, agent_id, assignment_id = assignment.id, "role assigned");
        Ok(assignment)
    }

    /// Close an assignment now; closing an inactive one is a no-op
    pub async fn end_assignment(
        &self,
        assignment_id: i64,
        actor: Option<i64>,
    ) -> Result<custom_role_assignments::Model, CircuitError> {
        let txn = self.db.inner().begin().await?;

        let assignment = custom_role_assignments::Entity::find_by_id(assignment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| CircuitError::not_found("CustomRoleAssignment", assignment_id))?;
        if !assignment.active {
            return Ok(assignment);
        }

        let now = Utc::now().naive_utc();
        let ends_at = assignment.ends_at.filter(|end| *end <= now).unwrap_or(now);
        let mut active: custom_role_assignments::ActiveModel = assignment.into();
        active.active = Set(false);
        active.ends_at = Set(Some(ends_at));
        let ended = active.update(&txn).await?;

        audit::record(
            &txn,
            ConfigEntity::RoleAssignment,
            ended.id,
            HistoryAction::Deactivate,
            Some(json!({"agent_id": ended.agent_id, "custom_role_id": ended.custom_role_id})),
            self.actor(actor),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(assignment_id, agent_id = ended.agent_id, "role assignment ended");
        Ok(ended)
    }

    // ------------------------------------------------------------------
    // Bootstrap and reads
    // ------------------------------------------------------------------

    /// Create the built-in templates that do not exist yet
    ///
    /// Idempotent: existence is checked by code, and existing templates are
    /// returned untouched.
    pub async fn initialize_system_workflows(
        &self,
    ) -> Result<Vec<workflow_templates::Model>, CircuitError> {
        let txn = self.db.inner().begin().await?;
        let mut templates = Vec::new();
        let mut created = 0;

        for definition in system_templates() {
            if let Some(existing) = store::find_template_by_code(&txn, definition.code).await? {
                templates.push(existing);
                continue;
            }

            let input = NewTemplate::new(definition.code, definition.name)
                .description(definition.description)
                .direction(definition.direction)
                .icon(definition.icon)
                .color(definition.color);
            let template = insert_template(&txn, &input, true, None).await?;

            for (index, role) in definition.roles.iter().enumerate() {
                let step = NewStep::new(role.clone(), index as i32 + 1);
                insert_step(&txn, template.id, &step).await?;
            }

            audit::record(
                &txn,
                ConfigEntity::Template,
                template.id,
                HistoryAction::Create,
                Some(json!({
                    "code": template.code,
                    "system": true,
                    "steps": definition.roles.iter().map(StepRole::role_type).collect::<Vec<_>>(),
                })),
                self.system_actor_id,
            )
            .await?;

            created += 1;
            templates.push(template);
        }

        txn.commit().await?;
        tracing::info!(created, total = templates.len(), "system workflows initialized");
        Ok(templates)
    }

    /// Display-oriented outline of a template
    pub async fn workflow_preview(&self, template_id: i64) -> Result<WorkflowPreview, CircuitError> {
        let conn = self.db.inner();
        let template = store::get_template(conn, template_id).await?;
        let direction = template.direction()?;
        let steps = store::template_steps(conn, template.id).await?;

        let codes: Vec<String> = steps
            .iter()
            .filter_map(|s| s.custom_role_name.clone())
            .collect();
        let labels: HashMap<String, String> = custom_roles::Entity::find()
            .filter(custom_roles::Column::Code.is_in(codes))
            .all(conn)
            .await?
            .into_iter()
            .map(|r| (r.code, r.label))
            .collect();

        Ok(build_preview(&template, direction, &steps, &labels))
    }

    pub async fn history_for(
        &self,
        entity: ConfigEntity,
        entity_id: i64,
    ) -> Result<Vec<workflow_config_history::Model>, CircuitError> {
        audit::history_for(self.db.inner(), entity, entity_id).await
    }

    pub async fn recent_history(
        &self,
        limit: u64,
    ) -> Result<Vec<workflow_config_history::Model>, CircuitError> {
        audit::recent_history(self.db.inner(), limit).await
    }
}

fn ensure_not_system(template: &workflow_templates::Model) -> Result<(), CircuitError> {
    if template.is_system {
        return Err(CircuitError::system_entity("WorkflowTemplate", template.code.clone()));
    }
    Ok(())
}

/// Stable text form of a form schema: JSON objects serialize with sorted keys
fn encode_form_schema(schema: &serde_json::Value) -> Result<String, CircuitError> {
    Ok(serde_json::to_string(schema)?)
}

fn step_changes(step: &workflow_template_steps::Model) -> serde_json::Value {
    json!({
        "template_id": step.template_id,
        "order_index": step.order_index,
        "role_type": step.role_type,
        "custom_role_name": step.custom_role_name,
    })
}

/// Insert an active assignment; the partial unique index turns a concurrent
/// duplicate into `AssignmentAlreadyActive`
async fn insert_assignment<C: ConnectionTrait>(
    conn: &C,
    role_id: i64,
    agent_id: i64,
    starts_at: NaiveDateTime,
    ends_at: Option<NaiveDateTime>,
    actor: Option<i64>,
) -> Result<custom_role_assignments::Model, CircuitError> {
    custom_role_assignments::ActiveModel {
        custom_role_id: Set(role_id),
        agent_id: Set(agent_id),
        starts_at: Set(starts_at),
        ends_at: Set(ends_at),
        active: Set(true),
        created_at: Set(starts_at),
        created_by: Set(actor),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            CircuitError::AssignmentAlreadyActive { role_id, agent_id }
        } else {
            e.into()
        }
    })
}

async fn insert_template<C: ConnectionTrait>(
    conn: &C,
    input: &NewTemplate,
    is_system: bool,
    actor: Option<i64>,
) -> Result<workflow_templates::Model, CircuitError> {
    if store::find_template_by_code(conn, &input.code).await?.is_some() {
        return Err(CircuitError::duplicate_code("WorkflowTemplate", input.code.clone()));
    }

    let now = Utc::now().naive_utc();
    workflow_templates::ActiveModel {
        code: Set(input.code.clone()),
        name: Set(input.name.clone()),
        description: Set(input.description.clone()),
        direction: Set(input.direction.as_str().to_string()),
        icon: Set(input.icon.clone()),
        color: Set(input.color.clone()),
        is_system: Set(is_system),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        created_by: Set(actor),
        updated_by: Set(actor),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            CircuitError::duplicate_code("WorkflowTemplate", input.code.clone())
        } else {
            e.into()
        }
    })
}

async fn insert_step<C: ConnectionTrait>(
    conn: &C,
    template_id: i64,
    input: &NewStep,
) -> Result<workflow_template_steps::Model, CircuitError> {
    let existing = store::template_steps(conn, template_id).await?;
    if existing.iter().any(|s| s.order_index == input.order_index) {
        return Err(CircuitError::DuplicateStepOrder {
            template_id,
            order_index: input.order_index,
        });
    }
    if existing.len() >= MAX_VALIDATION_LEVELS {
        tracing::warn!(
            template_id,
            steps = existing.len() + 1,
            "template has more steps than validation levels; extra steps are ignored"
        );
    }

    let now = Utc::now().naive_utc();
    workflow_template_steps::ActiveModel {
        template_id: Set(template_id),
        order_index: Set(input.order_index),
        role_type: Set(input.role.role_type().to_string()),
        custom_role_name: Set(input.role.custom_code().map(|c| c.trim().to_string())),
        mandatory: Set(input.mandatory),
        can_reject: Set(input.can_reject),
        deadline_days: Set(input.deadline_days),
        notify_email: Set(input.notify_email),
        notify_sms: Set(input.notify_sms),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            CircuitError::DuplicateStepOrder {
                template_id,
                order_index: input.order_index,
            }
        } else {
            e.into()
        }
    })
}
