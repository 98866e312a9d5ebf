//! Role directory
//!
//! Answers "who holds custom role X right now". An assignment counts when it
//! is active, has started, has not reached its `ends_at`, and both the role
//! and the agent are active. Expiry is evaluated at query time; nothing sweeps
//! stale assignments.

use crate::error::CircuitError;
use crate::workflow::config::{RoleTieBreak, WorkflowConfig};
use crate::workflow::entities::{agents, custom_role_assignments, custom_roles};
use crate::workflow::store;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use std::collections::HashMap;

/// A current holder of a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHolder {
    pub assignment: custom_role_assignments::Model,
    pub agent: agents::Model,
}

pub struct RoleDirectory<'c, C: ConnectionTrait> {
    conn: &'c C,
    tie_break: RoleTieBreak,
}

impl<'c, C: ConnectionTrait> RoleDirectory<'c, C> {
    /// Directory using the configured tie-break policy
    pub fn new(conn: &'c C) -> Self {
        Self::with_tie_break(conn, WorkflowConfig::current().role_tie_break)
    }

    pub fn with_tie_break(conn: &'c C, tie_break: RoleTieBreak) -> Self {
        Self { conn, tie_break }
    }

    /// Current holders of `role_code`, most recent assignment first
    pub async fn holders(&self, role_code: &str) -> Result<Vec<RoleHolder>, CircuitError> {
        self.holders_at(role_code, Utc::now().naive_utc()).await
    }

    pub async fn holders_at(
        &self,
        role_code: &str,
        at: NaiveDateTime,
    ) -> Result<Vec<RoleHolder>, CircuitError> {
        let role = match store::find_custom_role_by_code(self.conn, role_code).await? {
            Some(role) if role.active => role,
            _ => return Ok(Vec::new()),
        };

        let mut assignments: Vec<_> = custom_role_assignments::Entity::find()
            .filter(custom_role_assignments::Column::CustomRoleId.eq(role.id))
            .filter(custom_role_assignments::Column::Active.eq(true))
            .all(self.conn)
            .await?
            .into_iter()
            .filter(|a| a.is_effective(at))
            .collect();
        assignments.sort_by(|a, b| b.starts_at.cmp(&a.starts_at).then(b.id.cmp(&a.id)));

        let agent_ids: Vec<i64> = assignments.iter().map(|a| a.agent_id).collect();
        let by_id: HashMap<i64, agents::Model> = agents::Entity::find()
            .filter(agents::Column::Id.is_in(agent_ids))
            .filter(agents::Column::Active.eq(true))
            .all(self.conn)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(assignments
            .into_iter()
            .filter_map(|assignment| {
                by_id
                    .get(&assignment.agent_id)
                    .cloned()
                    .map(|agent| RoleHolder { assignment, agent })
            })
            .collect())
    }

    /// The single agent that approves for `role_code`
    ///
    /// `Ok(None)` when nobody holds the role. With several holders the
    /// configured [`RoleTieBreak`] decides; `Reject` returns
    /// `AmbiguousRoleHolder`.
    pub async fn resolve_holder(
        &self,
        role_code: &str,
    ) -> Result<Option<agents::Model>, CircuitError> {
        self.resolve_holder_at(role_code, Utc::now().naive_utc()).await
    }

    pub async fn resolve_holder_at(
        &self,
        role_code: &str,
        at: NaiveDateTime,
    ) -> Result<Option<agents::Model>, CircuitError> {
        let mut holders = self.holders_at(role_code, at).await?;
        if holders.len() > 1 {
            tracing::warn!(
                role = role_code,
                holders = holders.len(),
                policy = self.tie_break.as_str(),
                "custom role held by several agents"
            );
        }

        let picked = match self.tie_break {
            RoleTieBreak::Reject if holders.len() > 1 => {
                return Err(CircuitError::AmbiguousRoleHolder {
                    role_code: role_code.to_string(),
                    count: holders.len(),
                })
            }
            RoleTieBreak::Earliest => holders.pop(),
            _ => holders.into_iter().next(),
        };

        Ok(picked.map(|h| h.agent))
    }

    /// Codes of the active roles an agent currently holds, sorted
    pub async fn held_role_codes(&self, agent_id: i64) -> Result<Vec<String>, CircuitError> {
        self.held_role_codes_at(agent_id, Utc::now().naive_utc()).await
    }

    pub async fn held_role_codes_at(
        &self,
        agent_id: i64,
        at: NaiveDateTime,
    ) -> Result<Vec<String>, CircuitError> {
        let role_ids: Vec<i64> = custom_role_assignments::Entity::find()
            .filter(custom_role_assignments::Column::AgentId.eq(agent_id))
            .filter(custom_role_assignments::Column::Active.eq(true))
            .all(self.conn)
            .await?
            .into_iter()
            .filter(|a| a.is_effective(at))
            .map(|a| a.custom_role_id)
            .collect();

        let mut codes: Vec<String> = custom_roles::Entity::find()
            .filter(custom_roles::Column::Id.is_in(role_ids))
            .filter(custom_roles::Column::Active.eq(true))
            .all(self.conn)
            .await?
            .into_iter()
            .map(|r| r.code)
            .collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }

    /// Current holders of `role_code`, agents only
    pub async fn agents_with_role(&self, role_code: &str) -> Result<Vec<agents::Model>, CircuitError> {
        Ok(self
            .holders(role_code)
            .await?
            .into_iter()
            .map(|h| h.agent)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;
    use crate::testing::TestDatabase;
    use crate::workflow::fixtures;
    use crate::workflow::Migrator;
    use chrono::Duration;
    use sea_orm::{ActiveModelTrait, Set};

    #[tokio::test]
    async fn expired_and_future_assignments_are_ignored() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();
        let conn = conn.inner();

        let role = fixtures::role(conn, "RESP_BUDGET").await;
        let expired = fixtures::agent(conn, Some(1), None).await;
        let future = fixtures::agent(conn, Some(2), None).await;
        let current = fixtures::agent(conn, Some(3), None).await;

        let ended = Some(fixtures::days_ago(1));
        fixtures::assignment(conn, role.id, expired.id, fixtures::days_ago(30), ended).await;
        let tomorrow = fixtures::now() + Duration::days(5);
        fixtures::assignment(conn, role.id, future.id, tomorrow, None).await;
        fixtures::assignment(conn, role.id, current.id, fixtures::days_ago(10), None).await;

        let directory = RoleDirectory::with_tie_break(conn, RoleTieBreak::Reject);
        let holder = directory.resolve_holder("RESP_BUDGET").await.unwrap();
        expect!(holder.map(|a| a.id)).to_equal(Some(current.id));

        expect!(directory.held_role_codes(expired.id).await.unwrap()).to_be_empty();
        expect!(directory.held_role_codes(current.id).await.unwrap())
            .to_equal(vec!["RESP_BUDGET".to_string()]);
    }

    #[tokio::test]
    async fn tie_break_policy_picks_or_rejects() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();
        let conn = conn.inner();

        let role = fixtures::role(conn, "CONTROLEUR").await;
        let older = fixtures::agent(conn, Some(1), None).await;
        let newer = fixtures::agent(conn, Some(2), None).await;
        fixtures::assignment(conn, role.id, older.id, fixtures::days_ago(20), None).await;
        fixtures::assignment(conn, role.id, newer.id, fixtures::days_ago(2), None).await;

        let most_recent = RoleDirectory::with_tie_break(conn, RoleTieBreak::MostRecent)
            .resolve_holder("CONTROLEUR")
            .await
            .unwrap();
        expect!(most_recent.map(|a| a.id)).to_equal(Some(newer.id));

        let earliest = RoleDirectory::with_tie_break(conn, RoleTieBreak::Earliest)
            .resolve_holder("CONTROLEUR")
            .await
            .unwrap();
        expect!(earliest.map(|a| a.id)).to_equal(Some(older.id));

        let err = RoleDirectory::with_tie_break(conn, RoleTieBreak::Reject)
            .resolve_holder("CONTROLEUR")
            .await
            .unwrap_err();
        expect!(err.is_conflict()).to_be_true();
    }

    #[tokio::test]
    async fn inactive_role_or_agent_has_no_holder() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();
        let conn = conn.inner();

        let role = fixtures::role(conn, "AUDITEUR").await;
        let agent = fixtures::agent(conn, Some(1), None).await;
        fixtures::assignment(conn, role.id, agent.id, fixtures::days_ago(1), None).await;

        let mut inactive: agents::ActiveModel = agent.into();
        inactive.active = Set(false);
        inactive.update(conn).await.unwrap();

        let directory = RoleDirectory::with_tie_break(conn, RoleTieBreak::MostRecent);
        expect!(directory.agents_with_role("AUDITEUR").await.unwrap()).to_be_empty();
        expect!(directory.resolve_holder("UNKNOWN").await.unwrap()).to_be_none();
    }
}
