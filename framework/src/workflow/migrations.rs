//! Schema migrations for the approval-circuit tables
//!
//! Run them through [`Migrator`]:
//!
//! ```rust,ignore
//! use circuit::workflow::Migrator;
//! use sea_orm_migration::MigratorTrait;
//!
//! Migrator::up(db.inner(), None).await?;
//! ```

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(CreateAgentsTable),
            Box::new(CreateWorkflowTemplatesTable),
            Box::new(CreateWorkflowTemplateStepsTable),
            Box::new(CreateRequestTypesTable),
            Box::new(CreateCustomRolesTable),
            Box::new(CreateCustomRoleAssignmentsTable),
            Box::new(CreateWorkflowConfigHistoryTable),
            Box::new(CreateRequestsTable),
        ]
    }
}

fn id_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn timestamp_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

pub struct CreateAgentsTable;

impl MigrationName for CreateAgentsTable {
    fn name(&self) -> &str {
        "m20250101_000001_create_agents_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateAgentsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Agents::Table)
                    .if_not_exists()
                    .col(id_column(Agents::Id))
                    .col(ColumnDef::new(Agents::UserId).big_integer().null().unique_key())
                    .col(ColumnDef::new(Agents::LastName).string().not_null())
                    .col(ColumnDef::new(Agents::FirstName).string().not_null())
                    .col(ColumnDef::new(Agents::ManagerId).big_integer().null())
                    .col(ColumnDef::new(Agents::Active).boolean().not_null().default(true))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Agents::Table).to_owned())
            .await
    }
}

pub struct CreateWorkflowTemplatesTable;

impl MigrationName for CreateWorkflowTemplatesTable {
    fn name(&self) -> &str {
        "m20250101_000002_create_workflow_templates_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateWorkflowTemplatesTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkflowTemplates::Table)
                    .if_not_exists()
                    .col(id_column(WorkflowTemplates::Id))
                    .col(
                        ColumnDef::new(WorkflowTemplates::Code)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(WorkflowTemplates::Name).string_len(200).not_null())
                    .col(ColumnDef::new(WorkflowTemplates::Description).text().null())
                    .col(
                        ColumnDef::new(WorkflowTemplates::Direction)
                            .string_len(20)
                            .not_null()
                            .default("ASCENDANT"),
                    )
                    .col(ColumnDef::new(WorkflowTemplates::Icon).string_len(50).not_null())
                    .col(ColumnDef::new(WorkflowTemplates::Color).string_len(20).not_null())
                    .col(
                        ColumnDef::new(WorkflowTemplates::IsSystem)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(WorkflowTemplates::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(timestamp_column(WorkflowTemplates::CreatedAt))
                    .col(timestamp_column(WorkflowTemplates::UpdatedAt))
                    .col(ColumnDef::new(WorkflowTemplates::CreatedBy).big_integer().null())
                    .col(ColumnDef::new(WorkflowTemplates::UpdatedBy).big_integer().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkflowTemplates::Table).to_owned())
            .await
    }
}

pub struct CreateWorkflowTemplateStepsTable;

impl MigrationName for CreateWorkflowTemplateStepsTable {
    fn name(&self) -> &str {
        "m20250101_000003_create_workflow_template_steps_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateWorkflowTemplateStepsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkflowTemplateSteps::Table)
                    .if_not_exists()
                    .col(id_column(WorkflowTemplateSteps::Id))
                    .col(
                        ColumnDef::new(WorkflowTemplateSteps::TemplateId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WorkflowTemplateSteps::OrderIndex).integer().not_null())
                    .col(
                        ColumnDef::new(WorkflowTemplateSteps::RoleType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowTemplateSteps::CustomRoleName)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowTemplateSteps::Mandatory)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(WorkflowTemplateSteps::CanReject)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(WorkflowTemplateSteps::DeadlineDays).integer().null())
                    .col(
                        ColumnDef::new(WorkflowTemplateSteps::NotifyEmail)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(WorkflowTemplateSteps::NotifySms)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(timestamp_column(WorkflowTemplateSteps::CreatedAt))
                    .col(timestamp_column(WorkflowTemplateSteps::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workflow_template_steps_template")
                            .from(WorkflowTemplateSteps::Table, WorkflowTemplateSteps::TemplateId)
                            .to(WorkflowTemplates::Table, WorkflowTemplates::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workflow_template_steps_order")
                    .table(WorkflowTemplateSteps::Table)
                    .col(WorkflowTemplateSteps::TemplateId)
                    .col(WorkflowTemplateSteps::OrderIndex)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkflowTemplateSteps::Table).to_owned())
            .await
    }
}

pub struct CreateRequestTypesTable;

impl MigrationName for CreateRequestTypesTable {
    fn name(&self) -> &str {
        "m20250101_000004_create_request_types_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateRequestTypesTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RequestTypes::Table)
                    .if_not_exists()
                    .col(id_column(RequestTypes::Id))
                    .col(
                        ColumnDef::new(RequestTypes::Code)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(RequestTypes::Label).string_len(200).not_null())
                    .col(ColumnDef::new(RequestTypes::Description).text().null())
                    .col(
                        ColumnDef::new(RequestTypes::WorkflowTemplateId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestTypes::Category)
                            .string_len(50)
                            .not_null()
                            .default("Other"),
                    )
                    .col(ColumnDef::new(RequestTypes::Icon).string_len(50).null())
                    .col(ColumnDef::new(RequestTypes::Color).string_len(20).null())
                    .col(ColumnDef::new(RequestTypes::FormSchema).text().null())
                    .col(
                        ColumnDef::new(RequestTypes::DocumentRequired)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RequestTypes::AcceptedDocumentTypes)
                            .string_len(200)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RequestTypes::NeedsRhValidation)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RequestTypes::NeedsDafValidation)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RequestTypes::IsSystem)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(RequestTypes::Active).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(RequestTypes::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(999),
                    )
                    .col(timestamp_column(RequestTypes::CreatedAt))
                    .col(timestamp_column(RequestTypes::UpdatedAt))
                    .col(ColumnDef::new(RequestTypes::CreatedBy).big_integer().null())
                    .col(ColumnDef::new(RequestTypes::UpdatedBy).big_integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_types_template")
                            .from(RequestTypes::Table, RequestTypes::WorkflowTemplateId)
                            .to(WorkflowTemplates::Table, WorkflowTemplates::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_types_template")
                    .table(RequestTypes::Table)
                    .col(RequestTypes::WorkflowTemplateId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RequestTypes::Table).to_owned())
            .await
    }
}

pub struct CreateCustomRolesTable;

impl MigrationName for CreateCustomRolesTable {
    fn name(&self) -> &str {
        "m20250101_000005_create_custom_roles_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateCustomRolesTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CustomRoles::Table)
                    .if_not_exists()
                    .col(id_column(CustomRoles::Id))
                    .col(
                        ColumnDef::new(CustomRoles::Code)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(CustomRoles::Label).string_len(200).not_null())
                    .col(ColumnDef::new(CustomRoles::Description).text().null())
                    .col(ColumnDef::new(CustomRoles::Active).boolean().not_null().default(true))
                    .col(timestamp_column(CustomRoles::CreatedAt))
                    .col(timestamp_column(CustomRoles::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomRoles::Table).to_owned())
            .await
    }
}

pub struct CreateCustomRoleAssignmentsTable;

impl MigrationName for CreateCustomRoleAssignmentsTable {
    fn name(&self) -> &str {
        "m20250101_000006_create_custom_role_assignments_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateCustomRoleAssignmentsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CustomRoleAssignments::Table)
                    .if_not_exists()
                    .col(id_column(CustomRoleAssignments::Id))
                    .col(
                        ColumnDef::new(CustomRoleAssignments::CustomRoleId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomRoleAssignments::AgentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(timestamp_column(CustomRoleAssignments::StartsAt))
                    .col(ColumnDef::new(CustomRoleAssignments::EndsAt).timestamp().null())
                    .col(
                        ColumnDef::new(CustomRoleAssignments::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(timestamp_column(CustomRoleAssignments::CreatedAt))
                    .col(ColumnDef::new(CustomRoleAssignments::CreatedBy).big_integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_custom_role_assignments_role")
                            .from(CustomRoleAssignments::Table, CustomRoleAssignments::CustomRoleId)
                            .to(CustomRoles::Table, CustomRoles::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_custom_role_assignments_agent")
                            .from(CustomRoleAssignments::Table, CustomRoleAssignments::AgentId)
                            .to(Agents::Table, Agents::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one active assignment per (role, agent). sea-query has no
        // partial index builder, so this one is raw SQL; both SQLite and
        // Postgres accept it.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_custom_role_assignments_active \
                 ON custom_role_assignments (custom_role_id, agent_id) WHERE active",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomRoleAssignments::Table).to_owned())
            .await
    }
}

pub struct CreateWorkflowConfigHistoryTable;

impl MigrationName for CreateWorkflowConfigHistoryTable {
    fn name(&self) -> &str {
        "m20250101_000007_create_workflow_config_history_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateWorkflowConfigHistoryTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkflowConfigHistory::Table)
                    .if_not_exists()
                    .col(id_column(WorkflowConfigHistory::Id))
                    .col(
                        ColumnDef::new(WorkflowConfigHistory::EntityType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowConfigHistory::EntityId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowConfigHistory::Action)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(WorkflowConfigHistory::Changes).text().null())
                    .col(timestamp_column(WorkflowConfigHistory::PerformedAt))
                    .col(
                        ColumnDef::new(WorkflowConfigHistory::PerformedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workflow_config_history_entity")
                    .table(WorkflowConfigHistory::Table)
                    .col(WorkflowConfigHistory::EntityType)
                    .col(WorkflowConfigHistory::EntityId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkflowConfigHistory::Table).to_owned())
            .await
    }
}

pub struct CreateRequestsTable;

impl MigrationName for CreateRequestsTable {
    fn name(&self) -> &str {
        "m20250101_000008_create_requests_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateRequestsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Requests::Table)
                    .if_not_exists()
                    .col(id_column(Requests::Id))
                    .col(ColumnDef::new(Requests::TypeCode).string_len(50).not_null())
                    .col(ColumnDef::new(Requests::AgentId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Requests::CurrentState)
                            .string_len(20)
                            .not_null()
                            .default("DRAFT"),
                    )
                    .col(ColumnDef::new(Requests::CircuitSnapshot).text().null())
                    .col(timestamp_column(Requests::CreatedAt))
                    .col(timestamp_column(Requests::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requests_agent")
                            .from(Requests::Table, Requests::AgentId)
                            .to(Agents::Table, Agents::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_current_state")
                    .table(Requests::Table)
                    .col(Requests::CurrentState)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RequestTransitions::Table)
                    .if_not_exists()
                    .col(id_column(RequestTransitions::Id))
                    .col(
                        ColumnDef::new(RequestTransitions::RequestId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestTransitions::FromState)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestTransitions::ToState)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RequestTransitions::ActedByUserId).big_integer().null())
                    .col(ColumnDef::new(RequestTransitions::ActedByAgentId).big_integer().null())
                    .col(ColumnDef::new(RequestTransitions::Comment).text().null())
                    .col(timestamp_column(RequestTransitions::ActedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_transitions_request")
                            .from(RequestTransitions::Table, RequestTransitions::RequestId)
                            .to(Requests::Table, Requests::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RequestTransitions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Agents {
    Table,
    Id,
    UserId,
    LastName,
    FirstName,
    ManagerId,
    Active,
}

#[derive(DeriveIden)]
enum WorkflowTemplates {
    Table,
    Id,
    Code,
    Name,
    Description,
    Direction,
    Icon,
    Color,
    IsSystem,
    Active,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}

#[derive(DeriveIden)]
enum WorkflowTemplateSteps {
    Table,
    Id,
    TemplateId,
    OrderIndex,
    RoleType,
    CustomRoleName,
    Mandatory,
    CanReject,
    DeadlineDays,
    NotifyEmail,
    NotifySms,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RequestTypes {
    Table,
    Id,
    Code,
    Label,
    Description,
    WorkflowTemplateId,
    Category,
    Icon,
    Color,
    FormSchema,
    DocumentRequired,
    AcceptedDocumentTypes,
    NeedsRhValidation,
    NeedsDafValidation,
    IsSystem,
    Active,
    DisplayOrder,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}

#[derive(DeriveIden)]
enum CustomRoles {
    Table,
    Id,
    Code,
    Label,
    Description,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CustomRoleAssignments {
    Table,
    Id,
    CustomRoleId,
    AgentId,
    StartsAt,
    EndsAt,
    Active,
    CreatedAt,
    CreatedBy,
}

#[derive(DeriveIden)]
enum WorkflowConfigHistory {
    Table,
    Id,
    EntityType,
    EntityId,
    Action,
    Changes,
    PerformedAt,
    PerformedBy,
}

#[derive(DeriveIden)]
enum Requests {
    Table,
    Id,
    TypeCode,
    AgentId,
    CurrentState,
    CircuitSnapshot,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RequestTransitions {
    Table,
    Id,
    RequestId,
    FromState,
    ToState,
    ActedByUserId,
    ActedByAgentId,
    Comment,
    ActedAt,
}
