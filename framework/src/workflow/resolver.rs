//! Workflow resolver
//!
//! Derives a request's circuit from its request type and answers who must act
//! next. Read-only: a missing request type, template, step, role or holder is
//! a valid outcome ("no validator configured") and comes back as `None`, never
//! as an error. Errors are reserved for broken stored data and the database.
//!
//! ```rust,ignore
//! let resolver = Resolver::new(db.inner());
//!
//! let circuit = resolver.circuit(&request).await?;
//! if let Some(next) = resolver.next_state(&request).await? {
//!     let allowed = resolver.can_user_validate(user_id, &request, next).await?;
//! }
//! ```

use crate::error::CircuitError;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::entities::{agents, requests, workflow_templates};
use crate::workflow::hierarchy;
use crate::workflow::registry::RequestTypeRegistry;
use crate::workflow::roles::RoleDirectory;
use crate::workflow::snapshot::{CircuitSnapshot, CircuitStep};
use crate::workflow::store;
use crate::workflow::types::{StepRole, WorkflowState, MAX_VALIDATION_LEVELS};
use sea_orm::ConnectionTrait;
use std::collections::HashMap;

/// Circuit used when a request type has no active configuration
pub const FALLBACK_CIRCUIT: [WorkflowState; 3] = [
    WorkflowState::Draft,
    WorkflowState::Submitted,
    WorkflowState::Archived,
];

/// Ordered states for a step list
///
/// `DRAFT`, `SUBMITTED`, one `VALIDATION_Nk` per step, `ARCHIVED`. Steps past
/// the sixth have no state slot and are dropped.
pub fn build_circuit(steps: &[CircuitStep]) -> Vec<WorkflowState> {
    if steps.len() > MAX_VALIDATION_LEVELS {
        tracing::warn!(
            steps = steps.len(),
            kept = MAX_VALIDATION_LEVELS,
            "circuit truncated to the available validation levels"
        );
    }

    let mut circuit = vec![WorkflowState::Draft, WorkflowState::Submitted];
    circuit.extend((0..steps.len()).filter_map(WorkflowState::validation));
    circuit.push(WorkflowState::Archived);
    circuit
}

pub struct Resolver<'c, C: ConnectionTrait> {
    conn: &'c C,
    config: WorkflowConfig,
}

impl<'c, C: ConnectionTrait> Resolver<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self::with_config(conn, WorkflowConfig::current())
    }

    pub fn with_config(conn: &'c C, config: WorkflowConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Steps governing a request
    ///
    /// The frozen snapshot when the request has one, otherwise the live steps
    /// of the template bound to its active request type. `None` when there is
    /// no active request type or its template is gone.
    pub async fn governing_steps(
        &self,
        request: &requests::Model,
    ) -> Result<Option<Vec<CircuitStep>>, CircuitError> {
        if let Some(snapshot) = self.snapshot_for(request)? {
            return Ok(Some(snapshot.steps));
        }

        Ok(self
            .live_template(&request.type_code)
            .await?
            .map(|(_, steps)| steps))
    }

    /// Snapshot of the live configuration for a request type
    pub async fn capture_snapshot(
        &self,
        type_code: &str,
        at: chrono::NaiveDateTime,
    ) -> Result<Option<CircuitSnapshot>, CircuitError> {
        Ok(self
            .live_template(type_code)
            .await?
            .map(|(template, steps)| CircuitSnapshot::capture(&template, steps, at)))
    }

    /// Snapshot frozen into the request, if any
    pub fn snapshot_for(
        &self,
        request: &requests::Model,
    ) -> Result<Option<CircuitSnapshot>, CircuitError> {
        request
            .circuit_snapshot
            .as_deref()
            .map(CircuitSnapshot::decode)
            .transpose()
    }

    async fn live_template(
        &self,
        type_code: &str,
    ) -> Result<Option<(workflow_templates::Model, Vec<CircuitStep>)>, CircuitError> {
        let Some(template) = RequestTypeRegistry::new(self.conn).template_for(type_code).await? else {
            tracing::debug!(request_type = type_code, "no active request type configuration");
            return Ok(None);
        };

        let steps = store::template_steps(self.conn, template.id)
            .await?
            .iter()
            .map(CircuitStep::from_model)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some((template, steps)))
    }

    /// Full ordered circuit of a request
    pub async fn circuit(&self, request: &requests::Model) -> Result<Vec<WorkflowState>, CircuitError> {
        Ok(match self.governing_steps(request).await? {
            Some(steps) => build_circuit(&steps),
            None => FALLBACK_CIRCUIT.to_vec(),
        })
    }

    pub async fn circuit_for(&self, request_id: i64) -> Result<Vec<WorkflowState>, CircuitError> {
        let request = store::get_request(self.conn, request_id).await?;
        self.circuit(&request).await
    }

    /// State that follows the request's current one
    ///
    /// `None` once the request is at the end of its circuit, or when its
    /// current state is not part of the circuit (rejected requests, or a
    /// validation level the circuit no longer has).
    pub async fn next_state(
        &self,
        request: &requests::Model,
    ) -> Result<Option<WorkflowState>, CircuitError> {
        let current = request.state()?;
        let circuit = self.circuit(request).await?;

        Ok(circuit
            .iter()
            .position(|s| *s == current)
            .and_then(|pos| circuit.get(pos + 1))
            .copied())
    }

    /// Step whose approval moves the request into `to_state`
    pub async fn step_for(
        &self,
        request: &requests::Model,
        to_state: WorkflowState,
    ) -> Result<Option<CircuitStep>, CircuitError> {
        let Some(index) = to_state.validation_index() else {
            return Ok(None);
        };
        Ok(self
            .governing_steps(request)
            .await?
            .and_then(|mut steps| (index < steps.len()).then(|| steps.swap_remove(index))))
    }

    /// Agent expected to move the request into `to_state`
    ///
    /// `SUBMITTED` is always the initiator. `ARCHIVED` (and the other
    /// non-validation states) have no human approver.
    pub async fn expected_validator(
        &self,
        request: &requests::Model,
        to_state: WorkflowState,
    ) -> Result<Option<agents::Model>, CircuitError> {
        let validator = match to_state {
            WorkflowState::Submitted => store::find_agent(self.conn, request.agent_id).await?,
            state if state.validation_index().is_some() => match self.step_for(request, state).await? {
                Some(step) => {
                    hierarchy::resolve_step_role(self.conn, &self.config, &step.role, request.agent_id)
                        .await?
                }
                None => None,
            },
            _ => None,
        };

        tracing::debug!(
            request_id = request.id,
            to_state = to_state.as_str(),
            validator = ?validator.as_ref().map(|a| a.id),
            "expected validator resolved"
        );

        Ok(validator)
    }

    /// Whether `user_id` may move the request into `to_state`
    ///
    /// Fails closed when the user has no active agent, and when the target
    /// step's role has several holders under the `reject` tie-break. When no
    /// validator is configured for the target state the transition is open to
    /// any agent.
    pub async fn can_user_validate(
        &self,
        user_id: i64,
        request: &requests::Model,
        to_state: WorkflowState,
    ) -> Result<bool, CircuitError> {
        let Some(agent) = self.acting_agent(user_id).await? else {
            return Ok(false);
        };

        match self.expected_validator(request, to_state).await {
            Ok(Some(expected)) => Ok(expected.id == agent.id),
            Ok(None) => Ok(true),
            Err(CircuitError::AmbiguousRoleHolder { role_code, count }) => {
                tracing::warn!(
                    request_id = request.id,
                    role = %role_code,
                    holders = count,
                    "validator is ambiguous, refusing"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Active agent bound to a login
    pub async fn acting_agent(&self, user_id: i64) -> Result<Option<agents::Model>, CircuitError> {
        Ok(store::find_agent_by_user(self.conn, user_id)
            .await?
            .filter(|a| a.active))
    }

    /// Open requests the user may move forward, by id
    ///
    /// Scans every request not in `DRAFT`, `ARCHIVED` or `REJECTED`. Holders of
    /// roles that do not depend on the initiator (custom roles, RH, DAF) are
    /// resolved once per call. A request whose next role is ambiguous under the
    /// `reject` tie-break is skipped with a warning.
    pub async fn pending_requests_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<requests::Model>, CircuitError> {
        let Some(agent) = self.acting_agent(user_id).await? else {
            return Ok(Vec::new());
        };

        let mut holders: HashMap<String, Option<i64>> = HashMap::new();
        let mut pending = Vec::new();

        for request in store::open_requests(self.conn).await? {
            let Some(next) = self.next_state(&request).await? else {
                continue;
            };

            match self.pending_validator(&request, next, &mut holders).await {
                Ok(Some(expected)) if expected != agent.id => {}
                Ok(_) => pending.push(request),
                Err(CircuitError::AmbiguousRoleHolder { role_code, count }) => {
                    tracing::warn!(
                        request_id = request.id,
                        role = %role_code,
                        holders = count,
                        "skipping request with ambiguous validator"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(pending)
    }

    async fn pending_validator(
        &self,
        request: &requests::Model,
        next: WorkflowState,
        holders: &mut HashMap<String, Option<i64>>,
    ) -> Result<Option<i64>, CircuitError> {
        let Some(step) = self.step_for(request, next).await? else {
            return Ok(self.expected_validator(request, next).await?.map(|a| a.id));
        };

        let Some(code) = self.shared_role_code(&step.role) else {
            return Ok(hierarchy::resolve_step_role(self.conn, &self.config, &step.role, request.agent_id)
                .await?
                .map(|a| a.id));
        };

        if let Some(cached) = holders.get(&code) {
            return Ok(*cached);
        }
        let holder = RoleDirectory::with_tie_break(self.conn, self.config.role_tie_break)
            .resolve_holder(&code)
            .await?
            .map(|a| a.id);
        holders.insert(code, holder);
        Ok(holder)
    }

    /// Role code for step roles whose holder is the same for every request
    fn shared_role_code(&self, role: &StepRole) -> Option<String> {
        match role {
            StepRole::Custom(code) => Some(code.clone()),
            StepRole::Hr if self.config.resolve_hierarchy => Some(self.config.rh_role_code.clone()),
            StepRole::Daf if self.config.resolve_hierarchy => Some(self.config.daf_role_code.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;
    use crate::testing::TestDatabase;
    use crate::workflow::config::RoleTieBreak;
    use crate::workflow::fixtures;
    use crate::workflow::types::WorkflowDirection;
    use crate::workflow::Migrator;
    use pretty_assertions::assert_eq;
    use sea_orm::{ActiveModelTrait, Set};

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            role_tie_break: RoleTieBreak::MostRecent,
            resolve_hierarchy: true,
            rh_role_code: "RH".to_string(),
            daf_role_code: "DAF".to_string(),
            freeze_on_submit: true,
        }
    }

    async fn setup() -> TestDatabase {
        TestDatabase::fresh::<Migrator>().await.unwrap()
    }

    #[tokio::test]
    async fn circuit_has_one_level_per_step() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let agent = fixtures::agent(conn, Some(1), None).await;
        let resolver = Resolver::with_config(conn, config());

        for n in 1..=MAX_VALIDATION_LEVELS {
            let code = format!("T{}", n);
            let roles = vec![StepRole::NPlus1; n];
            let template = fixtures::template(conn, &code, WorkflowDirection::Ascendant, &roles).await;
            fixtures::request_type(conn, &code, template.id, true).await;
            let request = fixtures::request(conn, &code, agent.id, WorkflowState::Submitted).await;

            let circuit = resolver.circuit(&request).await.unwrap();
            assert_eq!(circuit.len(), 2 + n + 1);
            assert_eq!(circuit[0], WorkflowState::Draft);
            assert_eq!(circuit[1], WorkflowState::Submitted);
            assert_eq!(circuit[n + 1], WorkflowState::validation(n - 1).unwrap());
            assert_eq!(circuit[n + 2], WorkflowState::Archived);
        }
    }

    #[tokio::test]
    async fn steps_beyond_six_are_dropped() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let agent = fixtures::agent(conn, Some(1), None).await;

        let roles = vec![StepRole::Daf; 8];
        let template = fixtures::template(conn, "LONG", WorkflowDirection::Ascendant, &roles).await;
        fixtures::request_type(conn, "LONG", template.id, true).await;
        let request = fixtures::request(conn, "LONG", agent.id, WorkflowState::ValidationN6).await;

        let resolver = Resolver::with_config(conn, config());
        let circuit = resolver.circuit(&request).await.unwrap();
        assert_eq!(circuit.len(), 9);
        assert_eq!(circuit[7], WorkflowState::ValidationN6);
        assert_eq!(resolver.next_state(&request).await.unwrap(), Some(WorkflowState::Archived));
    }

    #[tokio::test]
    async fn unknown_or_retired_type_falls_back() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let agent = fixtures::agent(conn, Some(1), None).await;

        let template =
            fixtures::template(conn, "T", WorkflowDirection::Ascendant, &[StepRole::NPlus1]).await;
        fixtures::request_type(conn, "RETIRED", template.id, false).await;

        let resolver = Resolver::with_config(conn, config());
        for code in ["UNKNOWN", "RETIRED"] {
            let request = fixtures::request(conn, code, agent.id, WorkflowState::Submitted).await;
            assert_eq!(resolver.circuit(&request).await.unwrap(), FALLBACK_CIRCUIT.to_vec());
            expect!(resolver.expected_validator(&request, WorkflowState::ValidationN1).await.unwrap())
                .to_be_none();
        }
    }

    #[tokio::test]
    async fn submission_and_archival_validators() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let manager = fixtures::agent(conn, Some(1), None).await;
        let agent = fixtures::agent(conn, Some(2), Some(manager.id)).await;

        let template =
            fixtures::template(conn, "T", WorkflowDirection::Ascendant, &[StepRole::NPlus1]).await;
        fixtures::request_type(conn, "CONGE", template.id, true).await;
        let request = fixtures::request(conn, "CONGE", agent.id, WorkflowState::Draft).await;

        let resolver = Resolver::with_config(conn, config());
        let submitter = resolver.expected_validator(&request, WorkflowState::Submitted).await.unwrap();
        expect!(submitter.map(|a| a.id)).to_equal(Some(agent.id));
        let archiver = resolver.expected_validator(&request, WorkflowState::Archived).await.unwrap();
        expect!(archiver).to_be_none();
    }

    #[tokio::test]
    async fn can_validate_fails_closed_without_agent_and_opens_without_validator() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let manager = fixtures::agent(conn, Some(1), None).await;
        let agent = fixtures::agent(conn, Some(2), Some(manager.id)).await;
        fixtures::agent(conn, Some(3), None).await;

        let template = fixtures::template(
            conn,
            "T",
            WorkflowDirection::Ascendant,
            &[StepRole::NPlus1, StepRole::Custom("NOBODY".into())],
        )
        .await;
        fixtures::request_type(conn, "CONGE", template.id, true).await;
        let request = fixtures::request(conn, "CONGE", agent.id, WorkflowState::Submitted).await;

        let resolver = Resolver::with_config(conn, config());
        let n1 = WorkflowState::ValidationN1;

        // user 99 has no agent
        expect!(resolver.can_user_validate(99, &request, n1).await.unwrap()).to_be_false();
        expect!(resolver.can_user_validate(1, &request, n1).await.unwrap()).to_be_true();
        expect!(resolver.can_user_validate(3, &request, n1).await.unwrap()).to_be_false();

        let n2 = WorkflowState::ValidationN2;
        expect!(resolver.can_user_validate(3, &request, n2).await.unwrap()).to_be_true();
        expect!(resolver.can_user_validate(99, &request, n2).await.unwrap()).to_be_false();
    }

    #[tokio::test]
    async fn circuit_moyen_scenario() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let agent = fixtures::agent(conn, Some(1), None).await;

        let template = fixtures::template(
            conn,
            "CIRCUIT_MOYEN",
            WorkflowDirection::Ascendant,
            &[StepRole::NPlus1, StepRole::NPlus2],
        )
        .await;
        fixtures::request_type(conn, "AUTORISATION_ABSENCE", template.id, true).await;
        let request =
            fixtures::request(conn, "AUTORISATION_ABSENCE", agent.id, WorkflowState::Submitted).await;

        let resolver = Resolver::with_config(conn, config());
        assert_eq!(
            resolver.circuit(&request).await.unwrap(),
            vec![
                WorkflowState::Draft,
                WorkflowState::Submitted,
                WorkflowState::ValidationN1,
                WorkflowState::ValidationN2,
                WorkflowState::Archived,
            ]
        );
        assert_eq!(
            resolver.next_state(&request).await.unwrap(),
            Some(WorkflowState::ValidationN1)
        );
    }

    #[tokio::test]
    async fn custom_role_step_resolves_to_holder() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let requester = fixtures::agent(conn, Some(1), None).await;
        let a42 = fixtures::agent(conn, Some(42), None).await;

        let role = fixtures::role(conn, "RESP_BUDGET").await;
        fixtures::assignment(conn, role.id, a42.id, fixtures::days_ago(3), None).await;

        let template = fixtures::template(
            conn,
            "CIRCUIT_BUDGET",
            WorkflowDirection::Ascendant,
            &[StepRole::Custom("RESP_BUDGET".into())],
        )
        .await;
        fixtures::request_type(conn, "ENGAGEMENT", template.id, true).await;
        let request = fixtures::request(conn, "ENGAGEMENT", requester.id, WorkflowState::Submitted).await;

        let resolver = Resolver::with_config(conn, config());
        let validator = resolver
            .expected_validator(&request, WorkflowState::ValidationN1)
            .await
            .unwrap();
        expect!(validator.map(|a| a.id)).to_equal(Some(a42.id));
        expect!(resolver.can_user_validate(42, &request, WorkflowState::ValidationN1).await.unwrap())
            .to_be_true();
        expect!(resolver.can_user_validate(1, &request, WorkflowState::ValidationN1).await.unwrap())
            .to_be_false();
    }

    #[tokio::test]
    async fn ambiguous_holder_refuses_everyone_under_reject_policy() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let requester = fixtures::agent(conn, Some(1), None).await;
        let first = fixtures::agent(conn, Some(41), None).await;
        let second = fixtures::agent(conn, Some(42), None).await;

        let role = fixtures::role(conn, "X").await;
        fixtures::assignment(conn, role.id, first.id, fixtures::days_ago(3), None).await;
        fixtures::assignment(conn, role.id, second.id, fixtures::days_ago(1), None).await;

        let template = fixtures::template(
            conn,
            "CIRCUIT_X",
            WorkflowDirection::Ascendant,
            &[StepRole::Custom("X".into())],
        )
        .await;
        fixtures::request_type(conn, "ENGAGEMENT", template.id, true).await;
        let request = fixtures::request(conn, "ENGAGEMENT", requester.id, WorkflowState::Submitted).await;

        let resolver = Resolver::with_config(
            conn,
            WorkflowConfig {
                role_tie_break: RoleTieBreak::Reject,
                ..config()
            },
        );
        for user in [1, 41, 42] {
            let allowed = resolver.can_user_validate(user, &request, WorkflowState::ValidationN1).await;
            expect!(allowed.unwrap()).to_be_false();
        }
        expect!(resolver.pending_requests_for_user(42).await.unwrap()).to_be_empty();
    }

    #[tokio::test]
    async fn frozen_snapshot_wins_over_live_template() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let agent = fixtures::agent(conn, Some(1), None).await;

        let template =
            fixtures::template(conn, "T", WorkflowDirection::Ascendant, &[StepRole::NPlus1]).await;
        fixtures::request_type(conn, "CONGE", template.id, true).await;
        let request = fixtures::request(conn, "CONGE", agent.id, WorkflowState::Submitted).await;

        let resolver = Resolver::with_config(conn, config());
        let snapshot = resolver
            .capture_snapshot("CONGE", fixtures::now())
            .await
            .unwrap()
            .unwrap();
        let mut frozen: requests::ActiveModel = request.into();
        frozen.circuit_snapshot = Set(Some(snapshot.encode().unwrap()));
        let request = frozen.update(conn).await.unwrap();

        fixtures::step(conn, template.id, 2, StepRole::NPlus2, true).await;

        expect!(resolver.circuit(&request).await.unwrap()).to_have_length(4);
        let fresh = fixtures::request(conn, "CONGE", agent.id, WorkflowState::Submitted).await;
        expect!(resolver.circuit(&fresh).await.unwrap()).to_have_length(5);
    }

    #[tokio::test]
    async fn pending_lists_requests_awaiting_the_user() {
        let db = setup().await;
        let conn = db.conn();
        let conn = conn.inner();
        let chief = fixtures::agent(conn, Some(10), None).await;
        let clerk = fixtures::agent(conn, Some(11), Some(chief.id)).await;
        let boss = fixtures::agent(conn, Some(14), None).await;
        let other = fixtures::agent(conn, Some(12), Some(boss.id)).await;
        let budget = fixtures::agent(conn, Some(13), None).await;
        let role = fixtures::role(conn, "RESP_BUDGET").await;
        fixtures::assignment(conn, role.id, budget.id, fixtures::days_ago(1), None).await;

        let template = fixtures::template(
            conn,
            "T",
            WorkflowDirection::Ascendant,
            &[StepRole::NPlus1, StepRole::Custom("RESP_BUDGET".into())],
        )
        .await;
        fixtures::request_type(conn, "ENGAGEMENT", template.id, true).await;

        let at_n1 = fixtures::request(conn, "ENGAGEMENT", clerk.id, WorkflowState::Submitted).await;
        let at_n2 = fixtures::request(conn, "ENGAGEMENT", clerk.id, WorkflowState::ValidationN1).await;
        fixtures::request(conn, "ENGAGEMENT", clerk.id, WorkflowState::Draft).await;
        fixtures::request(conn, "ENGAGEMENT", clerk.id, WorkflowState::Rejected).await;
        fixtures::request(conn, "ENGAGEMENT", other.id, WorkflowState::Submitted).await;

        let resolver = Resolver::with_config(conn, config());
        let ids = |requests: Vec<requests::Model>| requests.into_iter().map(|r| r.id).collect::<Vec<_>>();

        assert_eq!(ids(resolver.pending_requests_for_user(10).await.unwrap()), vec![at_n1.id]);
        assert_eq!(ids(resolver.pending_requests_for_user(13).await.unwrap()), vec![at_n2.id]);
        expect!(resolver.pending_requests_for_user(11).await.unwrap()).to_be_empty();
        expect!(resolver.pending_requests_for_user(404).await.unwrap()).to_be_empty();
    }
}
