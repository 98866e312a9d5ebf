//! Configuration audit log
//!
//! Append-only. Entries are written inside the transaction of the change they
//! describe and are never updated or deleted.

use crate::error::CircuitError;
use crate::workflow::entities::workflow_config_history;
use crate::workflow::types::{ConfigEntity, HistoryAction};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Append one entry
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    entity: ConfigEntity,
    entity_id: i64,
    action: HistoryAction,
    changes: Option<serde_json::Value>,
    performed_by: i64,
) -> Result<workflow_config_history::Model, CircuitError> {
    let changes = changes.map(|c| serde_json::to_string(&c)).transpose()?;

    let entry = workflow_config_history::ActiveModel {
        entity_type: Set(entity.as_str().to_string()),
        entity_id: Set(entity_id),
        action: Set(action.as_str().to_string()),
        changes: Set(changes),
        performed_at: Set(Utc::now().naive_utc()),
        performed_by: Set(performed_by),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    tracing::debug!(
        entity = entity.as_str(),
        entity_id,
        action = action.as_str(),
        performed_by,
        "workflow config change recorded"
    );

    Ok(entry)
}

/// History of one entity, oldest first
pub async fn history_for<C: ConnectionTrait>(
    conn: &C,
    entity: ConfigEntity,
    entity_id: i64,
) -> Result<Vec<workflow_config_history::Model>, CircuitError> {
    Ok(workflow_config_history::Entity::find()
        .filter(workflow_config_history::Column::EntityType.eq(entity.as_str()))
        .filter(workflow_config_history::Column::EntityId.eq(entity_id))
        .order_by_asc(workflow_config_history::Column::Id)
        .all(conn)
        .await?)
}

/// Latest entries across all entities, newest first
pub async fn recent_history<C: ConnectionTrait>(
    conn: &C,
    limit: u64,
) -> Result<Vec<workflow_config_history::Model>, CircuitError> {
    Ok(workflow_config_history::Entity::find()
        .order_by_desc(workflow_config_history::Column::Id)
        .limit(limit)
        .all(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;
    use crate::testing::TestDatabase;
    use crate::workflow::Migrator;

    #[tokio::test]
    async fn entries_are_scoped_to_their_entity() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();

        record(
            conn.inner(),
            ConfigEntity::Template,
            1,
            HistoryAction::Create,
            Some(serde_json::json!({"code": "CIRCUIT_MOYEN"})),
            7,
        )
        .await
        .unwrap();
        record(conn.inner(), ConfigEntity::Template, 1, HistoryAction::Deactivate, None, 7)
            .await
            .unwrap();
        record(conn.inner(), ConfigEntity::CustomRole, 1, HistoryAction::Create, None, 7)
            .await
            .unwrap();

        let entries = history_for(conn.inner(), ConfigEntity::Template, 1).await.unwrap();
        let actions: Vec<Option<HistoryAction>> = entries.iter().map(|e| e.action()).collect();
        expect!(actions).to_equal(vec![Some(HistoryAction::Create), Some(HistoryAction::Deactivate)]);
        expect!(entries[0].changes.clone().unwrap()).to_contain("CIRCUIT_MOYEN");

        let recent = recent_history(conn.inner(), 2).await.unwrap();
        expect!(recent.len()).to_equal(2);
        expect!(recent[0].entity_type.clone()).to_equal("CustomRole".to_string());
    }
}
