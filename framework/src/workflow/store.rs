//! Persistence lookups shared by the resolver and the configuration service
//!
//! Every helper is generic over `ConnectionTrait` so it runs the same against
//! the pool and inside a transaction.

use crate::error::CircuitError;
use crate::workflow::entities::{
    agents, custom_roles, request_types, requests, workflow_template_steps, workflow_templates,
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

pub async fn find_template<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<workflow_templates::Model>, CircuitError> {
    Ok(workflow_templates::Entity::find_by_id(id).one(conn).await?)
}

/// Load a template or fail with `NotFound`
pub async fn get_template<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<workflow_templates::Model, CircuitError> {
    find_template(conn, id)
        .await?
        .ok_or_else(|| CircuitError::not_found("WorkflowTemplate", id))
}

pub async fn find_template_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<workflow_templates::Model>, CircuitError> {
    Ok(workflow_templates::Entity::find()
        .filter(workflow_templates::Column::Code.eq(code))
        .one(conn)
        .await?)
}

/// Steps of a template in circuit order
pub async fn template_steps<C: ConnectionTrait>(
    conn: &C,
    template_id: i64,
) -> Result<Vec<workflow_template_steps::Model>, CircuitError> {
    Ok(workflow_template_steps::Entity::find()
        .filter(workflow_template_steps::Column::TemplateId.eq(template_id))
        .order_by_asc(workflow_template_steps::Column::OrderIndex)
        .order_by_asc(workflow_template_steps::Column::Id)
        .all(conn)
        .await?)
}

pub async fn find_request_type<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<request_types::Model>, CircuitError> {
    Ok(request_types::Entity::find_by_id(id).one(conn).await?)
}

/// Request type by code, active or not
pub async fn find_request_type_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<request_types::Model>, CircuitError> {
    Ok(request_types::Entity::find()
        .filter(request_types::Column::Code.eq(code))
        .one(conn)
        .await?)
}

/// Number of request types bound to a template, optionally only active ones
pub async fn count_request_types_for_template<C: ConnectionTrait>(
    conn: &C,
    template_id: i64,
    active_only: bool,
) -> Result<usize, CircuitError> {
    let mut query = request_types::Entity::find()
        .filter(request_types::Column::WorkflowTemplateId.eq(template_id));
    if active_only {
        query = query.filter(request_types::Column::Active.eq(true));
    }
    Ok(query.count(conn).await? as usize)
}

pub async fn find_custom_role<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<custom_roles::Model>, CircuitError> {
    Ok(custom_roles::Entity::find_by_id(id).one(conn).await?)
}

pub async fn find_custom_role_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<custom_roles::Model>, CircuitError> {
    Ok(custom_roles::Entity::find()
        .filter(custom_roles::Column::Code.eq(code))
        .one(conn)
        .await?)
}

pub async fn find_agent<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<agents::Model>, CircuitError> {
    Ok(agents::Entity::find_by_id(id).one(conn).await?)
}

/// Active agent if `id` is set and points at one
pub async fn find_active_agent<C: ConnectionTrait>(
    conn: &C,
    id: Option<i64>,
) -> Result<Option<agents::Model>, CircuitError> {
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(find_agent(conn, id).await?.filter(|a| a.active))
}

/// Agent bound to a login
pub async fn find_agent_by_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<Option<agents::Model>, CircuitError> {
    Ok(agents::Entity::find()
        .filter(agents::Column::UserId.eq(user_id))
        .one(conn)
        .await?)
}

pub async fn find_request<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<requests::Model>, CircuitError> {
    Ok(requests::Entity::find_by_id(id).one(conn).await?)
}

pub async fn get_request<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<requests::Model, CircuitError> {
    find_request(conn, id)
        .await?
        .ok_or_else(|| CircuitError::not_found("Request", id))
}

/// Requests still moving through a circuit, by id
pub async fn open_requests<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<requests::Model>, CircuitError> {
    Ok(requests::Entity::find()
        .filter(requests::Column::CurrentState.is_not_in(["DRAFT", "ARCHIVED", "REJECTED"]))
        .order_by_asc(requests::Column::Id)
        .all(conn)
        .await?)
}
