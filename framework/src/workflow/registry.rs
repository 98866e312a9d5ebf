//! Request-type registry
//!
//! Maps a request-type code to the template that governs it, plus the form
//! metadata the request subsystem needs.

use crate::error::CircuitError;
use crate::workflow::entities::{request_types, workflow_templates};
use crate::workflow::store;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

pub struct RequestTypeRegistry<'c, C: ConnectionTrait> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> RequestTypeRegistry<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Active request type by code; retired types govern nothing
    pub async fn find_active(&self, code: &str) -> Result<Option<request_types::Model>, CircuitError> {
        Ok(self.find_by_code(code).await?.filter(|t| t.active))
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<request_types::Model>, CircuitError> {
        store::find_request_type_by_code(self.conn, code).await
    }

    /// Active types for a selection list, by display order then label
    pub async fn list_active(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<request_types::Model>, CircuitError> {
        let mut query = request_types::Entity::find().filter(request_types::Column::Active.eq(true));
        if let Some(category) = category {
            query = query.filter(request_types::Column::Category.eq(category));
        }
        Ok(query
            .order_by_asc(request_types::Column::DisplayOrder)
            .order_by_asc(request_types::Column::Label)
            .all(self.conn)
            .await?)
    }

    /// Template bound to an active request type
    ///
    /// The template's own `active` flag is not checked: retiring a template
    /// is refused while active types reference it.
    pub async fn template_for(
        &self,
        code: &str,
    ) -> Result<Option<workflow_templates::Model>, CircuitError> {
        let Some(request_type) = self.find_active(code).await? else {
            return Ok(None);
        };
        store::find_template(self.conn, request_type.workflow_template_id).await
    }
}

/// Decoded form schema of a request type
pub fn form_schema(request_type: &request_types::Model) -> Result<Option<serde_json::Value>, CircuitError> {
    request_type
        .form_schema
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(CircuitError::from)
}

/// Accepted upload extensions, lowercased and without dots
pub fn accepted_document_types(request_type: &request_types::Model) -> Vec<String> {
    request_type
        .accepted_document_types
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;
    use crate::testing::TestDatabase;
    use crate::workflow::fixtures;
    use crate::workflow::types::{StepRole, WorkflowDirection};
    use crate::workflow::Migrator;
    use sea_orm::{ActiveModelTrait, Set};

    #[tokio::test]
    async fn retired_types_are_not_active() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();
        let conn = conn.inner();

        let template =
            fixtures::template(conn, "CIRCUIT_MOYEN", WorkflowDirection::Ascendant, &[StepRole::NPlus1])
                .await;
        fixtures::request_type(conn, "CONGE", template.id, true).await;
        fixtures::request_type(conn, "ANCIEN", template.id, false).await;

        let registry = RequestTypeRegistry::new(conn);
        expect!(registry.find_active("CONGE").await.unwrap().is_some()).to_be_true();
        expect!(registry.find_active("ANCIEN").await.unwrap()).to_be_none();
        expect!(registry.find_by_code("ANCIEN").await.unwrap().is_some()).to_be_true();
        expect!(registry.template_for("CONGE").await.unwrap().map(|t| t.id)).to_equal(Some(template.id));
        expect!(registry.template_for("ANCIEN").await.unwrap()).to_be_none();
    }

    #[tokio::test]
    async fn list_orders_by_display_order_then_label() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();
        let conn = conn.inner();

        let template = fixtures::template(conn, "T", WorkflowDirection::Ascendant, &[]).await;
        let late = fixtures::request_type(conn, "B", template.id, true).await;
        fixtures::request_type(conn, "A", template.id, true).await;
        let mut first: request_types::ActiveModel = late.into();
        first.display_order = Set(1);
        first.category = Set("RH".to_string());
        first.update(conn).await.unwrap();

        let registry = RequestTypeRegistry::new(conn);
        let codes: Vec<String> = registry
            .list_active(None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.code)
            .collect();
        expect!(codes).to_equal(vec!["B".to_string(), "A".to_string()]);
        expect!(registry.list_active(Some("RH")).await.unwrap()).to_have_length(1);
    }

    #[test]
    fn document_types_are_normalized() {
        let model = request_types::Model {
            id: 1,
            code: "MISSION".into(),
            label: "Ordre de mission".into(),
            description: None,
            workflow_template_id: 1,
            category: "Other".into(),
            icon: None,
            color: None,
            form_schema: Some(r#"{"fields":[{"name":"destination"}]}"#.into()),
            document_required: true,
            accepted_document_types: Some(".PDF, jpg,,png".into()),
            needs_rh_validation: false,
            needs_daf_validation: false,
            is_system: false,
            active: true,
            display_order: 999,
            created_at: fixtures::now(),
            updated_at: fixtures::now(),
            created_by: None,
            updated_by: None,
        };

        expect!(accepted_document_types(&model))
            .to_equal(vec!["pdf".to_string(), "jpg".to_string(), "png".to_string()]);
        let schema = form_schema(&model).unwrap().unwrap();
        expect!(schema["fields"][0]["name"].clone()).to_equal(serde_json::json!("destination"));
    }
}
