//! SeaORM entities
//!
//! The first six tables belong to the workflow configuration. `agents`,
//! `requests` and `request_transitions` are owned by the personnel and request
//! subsystems; only the columns the resolver reads are mapped here.

pub mod workflow_templates {
    use crate::error::CircuitError;
    use crate::workflow::types::WorkflowDirection;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "workflow_templates")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        #[sea_orm(unique)]
        pub code: String,
        pub name: String,
        #[sea_orm(column_type = "Text", nullable)]
        pub description: Option<String>,
        pub direction: String,
        pub icon: String,
        pub color: String,
        pub is_system: bool,
        pub active: bool,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub created_by: Option<i64>,
        pub updated_by: Option<i64>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        pub fn direction(&self) -> Result<WorkflowDirection, CircuitError> {
            WorkflowDirection::parse(&self.direction)
        }
    }
}

pub mod workflow_template_steps {
    use crate::error::CircuitError;
    use crate::workflow::types::StepRole;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "workflow_template_steps")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub template_id: i64,
        pub order_index: i32,
        pub role_type: String,
        pub custom_role_name: Option<String>,
        pub mandatory: bool,
        pub can_reject: bool,
        pub deadline_days: Option<i32>,
        pub notify_email: bool,
        pub notify_sms: bool,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        pub fn role(&self) -> Result<StepRole, CircuitError> {
            StepRole::from_columns(&self.role_type, self.custom_role_name.as_deref())
        }
    }
}

pub mod request_types {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "request_types")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        #[sea_orm(unique)]
        pub code: String,
        pub label: String,
        #[sea_orm(column_type = "Text", nullable)]
        pub description: Option<String>,
        pub workflow_template_id: i64,
        pub category: String,
        pub icon: Option<String>,
        pub color: Option<String>,
        #[sea_orm(column_type = "Text", nullable)]
        pub form_schema: Option<String>,
        pub document_required: bool,
        pub accepted_document_types: Option<String>,
        pub needs_rh_validation: bool,
        pub needs_daf_validation: bool,
        pub is_system: bool,
        pub active: bool,
        pub display_order: i32,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub created_by: Option<i64>,
        pub updated_by: Option<i64>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod custom_roles {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "custom_roles")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        #[sea_orm(unique)]
        pub code: String,
        pub label: String,
        #[sea_orm(column_type = "Text", nullable)]
        pub description: Option<String>,
        pub active: bool,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod custom_role_assignments {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "custom_role_assignments")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub custom_role_id: i64,
        pub agent_id: i64,
        pub starts_at: chrono::NaiveDateTime,
        pub ends_at: Option<chrono::NaiveDateTime>,
        pub active: bool,
        pub created_at: chrono::NaiveDateTime,
        pub created_by: Option<i64>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        /// Active, started, and not yet expired at `at`
        pub fn is_effective(&self, at: chrono::NaiveDateTime) -> bool {
            self.active && self.starts_at <= at && self.ends_at.map_or(true, |end| end > at)
        }
    }
}

pub mod workflow_config_history {
    use crate::workflow::types::HistoryAction;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "workflow_config_history")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub entity_type: String,
        pub entity_id: i64,
        pub action: String,
        #[sea_orm(column_type = "Text", nullable)]
        pub changes: Option<String>,
        pub performed_at: chrono::NaiveDateTime,
        pub performed_by: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        /// `None` for actions written by other tools
        pub fn action(&self) -> Option<HistoryAction> {
            HistoryAction::from_str(&self.action)
        }
    }
}

pub mod agents {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "agents")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        /// Login bound to this agent, if any
        pub user_id: Option<i64>,
        pub last_name: String,
        pub first_name: String,
        pub manager_id: Option<i64>,
        pub active: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        pub fn full_name(&self) -> String {
            format!("{} {}", self.last_name, self.first_name)
        }
    }
}

pub mod requests {
    use crate::error::CircuitError;
    use crate::workflow::types::WorkflowState;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "requests")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub type_code: String,
        /// Initiating agent
        pub agent_id: i64,
        pub current_state: String,
        #[sea_orm(column_type = "Text", nullable)]
        pub circuit_snapshot: Option<String>,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        pub fn state(&self) -> Result<WorkflowState, CircuitError> {
            WorkflowState::parse(&self.current_state)
        }
    }
}

pub mod request_transitions {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "request_transitions")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub request_id: i64,
        pub from_state: String,
        pub to_state: String,
        pub acted_by_user_id: Option<i64>,
        pub acted_by_agent_id: Option<i64>,
        #[sea_orm(column_type = "Text", nullable)]
        pub comment: Option<String>,
        pub acted_at: chrono::NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
