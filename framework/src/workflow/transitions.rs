//! Request state transitions
//!
//! Moves requests along their circuit. Every transition checks the target
//! against the circuit, checks the actor with the resolver, updates the
//! request and appends a `request_transitions` row in a single transaction.
//!
//! The request update is conditional on the state read at the start, so two
//! validators racing on the same request cannot both win.

use crate::database::{DbConnection, DB};
use crate::error::CircuitError;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::entities::{agents, request_transitions, requests};
use crate::workflow::resolver::Resolver;
use crate::workflow::snapshot::CircuitSnapshot;
use crate::workflow::store;
use crate::workflow::types::WorkflowState;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

pub struct RequestTransitions {
    db: DbConnection,
    config: WorkflowConfig,
}

impl RequestTransitions {
    pub fn new() -> Result<Self, CircuitError> {
        Ok(Self::with_connection(DB::connection()?))
    }

    pub fn with_connection(db: DbConnection) -> Self {
        Self {
            db,
            config: WorkflowConfig::current(),
        }
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Submit a draft; only its initiator may do so
    pub async fn submit(
        &self,
        request_id: i64,
        user_id: i64,
        comment: Option<String>,
    ) -> Result<requests::Model, CircuitError> {
        self.advance(request_id, user_id, WorkflowState::Submitted, comment)
            .await
    }

    /// Move a request into `to`, which must be its next state
    ///
    /// On submission the circuit is frozen into the request when
    /// `freeze_on_submit` is set and no snapshot exists yet.
    pub async fn advance(
        &self,
        request_id: i64,
        user_id: i64,
        to: WorkflowState,
        comment: Option<String>,
    ) -> Result<requests::Model, CircuitError> {
        let txn = self.db.inner().begin().await?;
        let resolver = Resolver::with_config(&txn, self.config.clone());

        let request = store::get_request(&txn, request_id).await?;
        let from = request.state()?;
        if resolver.next_state(&request).await? != Some(to) {
            return Err(not_allowed(from, to));
        }

        let agent = authorize(&resolver, user_id, &request, to).await?;

        let snapshot = if to == WorkflowState::Submitted
            && self.config.freeze_on_submit
            && request.circuit_snapshot.is_none()
        {
            resolver
                .capture_snapshot(&request.type_code, Utc::now().naive_utc())
                .await?
                .map(|s| s.encode())
                .transpose()?
        } else {
            None
        };

        let updated = move_request(&txn, &request, from, to, snapshot).await?;
        journal(&txn, &updated, from, to, user_id, &agent, comment).await?;

        txn.commit().await?;
        tracing::info!(
            request_id,
            from = from.as_str(),
            to = to.as_str(),
            agent_id = agent.id,
            "request advanced"
        );
        Ok(updated)
    }

    /// Reject a request at its pending step
    ///
    /// Allowed only for the validator of the next validation step, and only
    /// when that step is rejectable. Requests whose next state is not a
    /// validation level (drafts, fallback circuits, archival) cannot be
    /// rejected.
    pub async fn reject(
        &self,
        request_id: i64,
        user_id: i64,
        comment: Option<String>,
    ) -> Result<requests::Model, CircuitError> {
        let txn = self.db.inner().begin().await?;
        let resolver = Resolver::with_config(&txn, self.config.clone());

        let request = store::get_request(&txn, request_id).await?;
        let from = request.state()?;
        let rejected = WorkflowState::Rejected;

        let Some(next) = resolver.next_state(&request).await? else {
            return Err(not_allowed(from, rejected));
        };
        let Some(step) = resolver.step_for(&request, next).await? else {
            return Err(not_allowed(from, rejected));
        };
        if !step.can_reject {
            return Err(not_allowed(from, rejected));
        }

        let agent = authorize(&resolver, user_id, &request, next).await?;

        let updated = move_request(&txn, &request, from, rejected, None).await?;
        journal(&txn, &updated, from, rejected, user_id, &agent, comment).await?;

        txn.commit().await?;
        tracing::info!(
            request_id,
            from = from.as_str(),
            step = step.order_index,
            agent_id = agent.id,
            "request rejected"
        );
        Ok(updated)
    }

    /// Freeze the current configuration into the request
    ///
    /// Keeps an existing snapshot. `None` when the request type has no active
    /// configuration to freeze.
    pub async fn freeze_circuit(&self, request_id: i64) -> Result<Option<CircuitSnapshot>, CircuitError> {
        let txn = self.db.inner().begin().await?;
        let resolver = Resolver::with_config(&txn, self.config.clone());

        let request = store::get_request(&txn, request_id).await?;
        if let Some(existing) = resolver.snapshot_for(&request)? {
            return Ok(Some(existing));
        }

        let now = Utc::now().naive_utc();
        let Some(snapshot) = resolver.capture_snapshot(&request.type_code, now).await? else {
            return Ok(None);
        };

        let mut active: requests::ActiveModel = request.into();
        active.circuit_snapshot = Set(Some(snapshot.encode()?));
        active.updated_at = Set(now);
        active.update(&txn).await?;

        txn.commit().await?;
        tracing::info!(
            request_id,
            template = %snapshot.template_code,
            steps = snapshot.steps.len(),
            "circuit frozen"
        );
        Ok(Some(snapshot))
    }

    /// Transition journal of a request, oldest first
    pub async fn history(&self, request_id: i64) -> Result<Vec<request_transitions::Model>, CircuitError> {
        Ok(request_transitions::Entity::find()
            .filter(request_transitions::Column::RequestId.eq(request_id))
            .order_by_asc(request_transitions::Column::ActedAt)
            .order_by_asc(request_transitions::Column::Id)
            .all(self.db.inner())
            .await?)
    }
}

fn not_allowed(from: WorkflowState, to: WorkflowState) -> CircuitError {
    CircuitError::TransitionNotAllowed {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

/// Acting agent of `user_id`, if the resolver lets them move the request into `to`
async fn authorize(
    resolver: &Resolver<'_, DatabaseTransaction>,
    user_id: i64,
    request: &requests::Model,
    to: WorkflowState,
) -> Result<agents::Model, CircuitError> {
    let agent = resolver.acting_agent(user_id).await?;
    let allowed = resolver.can_user_validate(user_id, request, to).await?;

    match agent {
        Some(agent) if allowed => Ok(agent),
        _ => {
            let expected = resolver
                .expected_validator(request, to)
                .await?
                .map(|a| a.full_name())
                .unwrap_or_else(|| "an active agent".to_string());
            tracing::warn!(
                request_id = request.id,
                user_id,
                to = to.as_str(),
                "transition refused for this user"
            );
            Err(CircuitError::NotExpectedValidator { expected })
        }
    }
}

async fn move_request(
    txn: &DatabaseTransaction,
    request: &requests::Model,
    from: WorkflowState,
    to: WorkflowState,
    snapshot: Option<String>,
) -> Result<requests::Model, CircuitError> {
    let mut update = requests::Entity::update_many()
        .col_expr(requests::Column::CurrentState, Expr::value(to.as_str()))
        .col_expr(requests::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()));
    if let Some(snapshot) = snapshot {
        update = update.col_expr(requests::Column::CircuitSnapshot, Expr::value(snapshot));
    }

    let result = update
        .filter(requests::Column::Id.eq(request.id))
        .filter(requests::Column::CurrentState.eq(from.as_str()))
        .exec(txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(not_allowed(from, to));
    }

    store::get_request(txn, request.id).await
}

async fn journal(
    txn: &DatabaseTransaction,
    request: &requests::Model,
    from: WorkflowState,
    to: WorkflowState,
    user_id: i64,
    agent: &agents::Model,
    comment: Option<String>,
) -> Result<request_transitions::Model, CircuitError> {
    Ok(request_transitions::ActiveModel {
        request_id: Set(request.id),
        from_state: Set(from.as_str().to_string()),
        to_state: Set(to.as_str().to_string()),
        acted_by_user_id: Set(Some(user_id)),
        acted_by_agent_id: Set(Some(agent.id)),
        comment: Set(comment.filter(|c| !c.trim().is_empty())),
        acted_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(txn)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;
    use crate::testing::TestDatabase;
    use crate::workflow::config::RoleTieBreak;
    use crate::workflow::fixtures;
    use crate::workflow::types::{StepRole, WorkflowDirection};
    use crate::workflow::Migrator;
    use pretty_assertions::assert_eq;

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            role_tie_break: RoleTieBreak::MostRecent,
            resolve_hierarchy: true,
            rh_role_code: "RH".to_string(),
            daf_role_code: "DAF".to_string(),
            freeze_on_submit: true,
        }
    }

    struct Org {
        db: TestDatabase,
        transitions: RequestTransitions,
        request: requests::Model,
    }

    /// Agent (user 3) reporting to manager (user 2) reporting to director (user 1),
    /// with a draft on a two-step N+1, N+2 circuit whose second step cannot reject
    async fn org() -> Org {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();
        let conn = conn.inner();

        let director = fixtures::agent(conn, Some(1), None).await;
        let manager = fixtures::agent(conn, Some(2), Some(director.id)).await;
        let agent = fixtures::agent(conn, Some(3), Some(manager.id)).await;

        let template = fixtures::template(conn, "CIRCUIT_MOYEN", WorkflowDirection::Ascendant, &[]).await;
        fixtures::step(conn, template.id, 1, StepRole::NPlus1, true).await;
        fixtures::step(conn, template.id, 2, StepRole::NPlus2, false).await;
        fixtures::request_type(conn, "CONGE", template.id, true).await;

        let request = fixtures::request(conn, "CONGE", agent.id, WorkflowState::Draft).await;
        let transitions = RequestTransitions::with_connection(db.conn()).with_config(config());

        Org {
            db,
            transitions,
            request,
        }
    }

    #[tokio::test]
    async fn full_circuit_is_walked_by_the_expected_validators() {
        let org = org().await;
        let id = org.request.id;
        let t = &org.transitions;

        let submitted = t.submit(id, 3, Some("Congé annuel".into())).await.unwrap();
        expect!(submitted.current_state.clone()).to_equal("SUBMITTED".to_string());
        expect!(submitted.circuit_snapshot.is_some()).to_be_true();

        t.advance(id, 2, WorkflowState::ValidationN1, None).await.unwrap();
        t.advance(id, 1, WorkflowState::ValidationN2, None).await.unwrap();
        // nobody is configured for archival
        let archived = t.advance(id, 3, WorkflowState::Archived, None).await.unwrap();
        expect!(archived.current_state.clone()).to_equal("ARCHIVED".to_string());

        let journal: Vec<(String, String, Option<i64>)> = t
            .history(id)
            .await
            .unwrap()
            .into_iter()
            .map(|row| (row.from_state, row.to_state, row.acted_by_user_id))
            .collect();
        assert_eq!(
            journal,
            vec![
                ("DRAFT".to_string(), "SUBMITTED".to_string(), Some(3)),
                ("SUBMITTED".to_string(), "VALIDATION_N1".to_string(), Some(2)),
                ("VALIDATION_N1".to_string(), "VALIDATION_N2".to_string(), Some(1)),
                ("VALIDATION_N2".to_string(), "ARCHIVED".to_string(), Some(3)),
            ]
        );
        assert_eq!(t.history(id).await.unwrap()[0].comment, Some("Congé annuel".to_string()));
    }

    #[tokio::test]
    async fn skipping_a_level_or_acting_for_someone_else_is_refused() {
        let org = org().await;
        let id = org.request.id;
        let t = &org.transitions;

        // only the initiator submits
        let err = t.submit(id, 2, None).await.unwrap_err();
        expect!(matches!(err, CircuitError::NotExpectedValidator { .. })).to_be_true();

        t.submit(id, 3, None).await.unwrap();

        let err = t.advance(id, 1, WorkflowState::ValidationN2, None).await.unwrap_err();
        expect!(err.to_string()).to_equal("Transition SUBMITTED -> VALIDATION_N2 is not allowed".to_string());

        let err = t.advance(id, 1, WorkflowState::ValidationN1, None).await.unwrap_err();
        expect!(err.status_code()).to_equal(403);
        expect!(err.to_string()).to_contain("Agent2");

        // user without an agent
        let err = t.advance(id, 99, WorkflowState::ValidationN1, None).await.unwrap_err();
        expect!(err.status_code()).to_equal(403);

        let err = t.submit(id, 3, None).await.unwrap_err();
        expect!(err.is_conflict()).to_be_true();
        expect!(t.history(id).await.unwrap()).to_have_length(1);
    }

    #[tokio::test]
    async fn rejection_follows_the_step_policy() {
        let org = org().await;
        let id = org.request.id;
        let t = &org.transitions;

        // a draft has no pending validation step
        expect!(t.reject(id, 3, None).await.unwrap_err().is_conflict()).to_be_true();

        t.submit(id, 3, None).await.unwrap();
        expect!(t.reject(id, 1, None).await.unwrap_err().status_code()).to_equal(403);

        t.advance(id, 2, WorkflowState::ValidationN1, None).await.unwrap();
        // second step is not rejectable
        expect!(t.reject(id, 1, None).await.unwrap_err().is_conflict()).to_be_true();
    }

    #[tokio::test]
    async fn rejected_request_is_terminal() {
        let org = org().await;
        let id = org.request.id;
        let t = &org.transitions;

        t.submit(id, 3, None).await.unwrap();
        let rejected = t.reject(id, 2, Some("Période chargée".into())).await.unwrap();
        expect!(rejected.current_state.clone()).to_equal("REJECTED".to_string());

        let err = t.advance(id, 2, WorkflowState::ValidationN1, None).await.unwrap_err();
        expect!(err.is_conflict()).to_be_true();
        expect!(t.reject(id, 2, None).await.unwrap_err().is_conflict()).to_be_true();
    }

    #[tokio::test]
    async fn frozen_circuit_survives_template_edits() {
        let org = org().await;
        let id = org.request.id;
        let t = &org.transitions;
        let conn = org.db.conn();

        let snapshot = t.freeze_circuit(id).await.unwrap().unwrap();
        expect!(snapshot.steps.len()).to_equal(2);
        let template_id = snapshot.template_id;

        // a third level added later does not reach the frozen request
        fixtures::step(conn.inner(), template_id, 3, StepRole::Daf, true).await;
        let again = t.freeze_circuit(id).await.unwrap().unwrap();
        expect!(again.steps.len()).to_equal(2);

        t.submit(id, 3, None).await.unwrap();
        t.advance(id, 2, WorkflowState::ValidationN1, None).await.unwrap();
        t.advance(id, 1, WorkflowState::ValidationN2, None).await.unwrap();
        let err = t.advance(id, 1, WorkflowState::ValidationN3, None).await.unwrap_err();
        expect!(err.is_conflict()).to_be_true();
    }

    #[tokio::test]
    async fn untyped_request_has_nothing_to_freeze() {
        let org = org().await;
        let conn = org.db.conn();
        let agent = store::find_agent_by_user(conn.inner(), 3).await.unwrap().unwrap();
        let request = fixtures::request(conn.inner(), "INCONNU", agent.id, WorkflowState::Draft).await;

        expect!(org.transitions.freeze_circuit(request.id).await.unwrap()).to_be_none();

        // fallback circuit: submit then archive
        let submitted = org.transitions.submit(request.id, 3, None).await.unwrap();
        expect!(submitted.circuit_snapshot).to_be_none();
        let archived = org
            .transitions
            .advance(request.id, 2, WorkflowState::Archived, None)
            .await
            .unwrap();
        expect!(archived.current_state).to_equal("ARCHIVED".to_string());
    }
}
