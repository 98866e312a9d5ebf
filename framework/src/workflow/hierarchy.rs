//! Step role to agent resolution

use crate::error::CircuitError;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::entities::agents;
use crate::workflow::roles::RoleDirectory;
use crate::workflow::store;
use crate::workflow::types::StepRole;
use sea_orm::ConnectionTrait;

/// Agent who approves a step of `initiator_id`'s request
///
/// Fixed role kinds follow the organisation chart (`agents.manager_id`) or,
/// for RH and DAF, the holder of the configured custom role. They are skipped
/// entirely when `resolve_hierarchy` is off. A missing link anywhere yields
/// `Ok(None)`.
pub async fn resolve_step_role<C: ConnectionTrait>(
    conn: &C,
    config: &WorkflowConfig,
    role: &StepRole,
    initiator_id: i64,
) -> Result<Option<agents::Model>, CircuitError> {
    let directory = RoleDirectory::with_tie_break(conn, config.role_tie_break);

    if let StepRole::Custom(code) = role {
        return directory.resolve_holder(code).await;
    }
    if !config.resolve_hierarchy {
        return Ok(None);
    }

    match role {
        StepRole::Requester => store::find_active_agent(conn, Some(initiator_id)).await,
        StepRole::NPlus1 => manager_of(conn, initiator_id).await,
        StepRole::NPlus2 => match manager_of(conn, initiator_id).await? {
            // A two-agent loop in the chart would hand the request back to its initiator
            Some(manager) => Ok(manager_of(conn, manager.id)
                .await?
                .filter(|a| a.id != initiator_id)),
            None => Ok(None),
        },
        StepRole::Hr => directory.resolve_holder(&config.rh_role_code).await,
        StepRole::Daf => directory.resolve_holder(&config.daf_role_code).await,
        StepRole::Custom(_) => Ok(None),
    }
}

/// Active direct manager of an agent
pub async fn manager_of<C: ConnectionTrait>(
    conn: &C,
    agent_id: i64,
) -> Result<Option<agents::Model>, CircuitError> {
    let Some(agent) = store::find_agent(conn, agent_id).await? else {
        return Ok(None);
    };
    if agent.manager_id == Some(agent.id) {
        return Ok(None);
    }
    store::find_active_agent(conn, agent.manager_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;
    use crate::testing::TestDatabase;
    use crate::workflow::config::RoleTieBreak;
    use crate::workflow::fixtures;
    use crate::workflow::Migrator;
    use sea_orm::{ActiveModelTrait, Set};

    fn config(resolve_hierarchy: bool) -> WorkflowConfig {
        WorkflowConfig {
            role_tie_break: RoleTieBreak::MostRecent,
            resolve_hierarchy,
            rh_role_code: "RH".to_string(),
            daf_role_code: "DAF".to_string(),
            freeze_on_submit: true,
        }
    }

    #[tokio::test]
    async fn walks_the_management_chain() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();
        let conn = conn.inner();

        let director = fixtures::agent(conn, Some(1), None).await;
        let chief = fixtures::agent(conn, Some(2), Some(director.id)).await;
        let clerk = fixtures::agent(conn, Some(3), Some(chief.id)).await;
        let hr = fixtures::agent(conn, Some(4), None).await;
        let hr_role = fixtures::role(conn, "RH").await;
        fixtures::assignment(conn, hr_role.id, hr.id, fixtures::days_ago(1), None).await;

        let cfg = config(true);
        for (role, expected) in [
            (StepRole::Requester, Some(clerk.id)),
            (StepRole::NPlus1, Some(chief.id)),
            (StepRole::NPlus2, Some(director.id)),
            (StepRole::Hr, Some(hr.id)),
            (StepRole::Daf, None),
        ] {
            let agent = resolve_step_role(conn, &cfg, &role, clerk.id).await.unwrap();
            expect!(agent.map(|a| a.id)).to_equal(expected);
        }
    }

    #[tokio::test]
    async fn fixed_roles_stay_open_without_hierarchy() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();
        let conn = conn.inner();

        let chief = fixtures::agent(conn, Some(1), None).await;
        let clerk = fixtures::agent(conn, Some(2), Some(chief.id)).await;
        let role = fixtures::role(conn, "RESP_BUDGET").await;
        fixtures::assignment(conn, role.id, chief.id, fixtures::days_ago(1), None).await;

        let cfg = config(false);
        let n1 = resolve_step_role(conn, &cfg, &StepRole::NPlus1, clerk.id).await.unwrap();
        expect!(n1).to_be_none();

        let custom = StepRole::Custom("RESP_BUDGET".into());
        let holder = resolve_step_role(conn, &cfg, &custom, clerk.id).await.unwrap();
        expect!(holder.map(|a| a.id)).to_equal(Some(chief.id));
    }

    #[tokio::test]
    async fn management_loop_never_returns_the_initiator() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let conn = db.conn();
        let conn = conn.inner();

        let clerk = fixtures::agent(conn, Some(1), None).await;
        let chief = fixtures::agent(conn, Some(2), Some(clerk.id)).await;
        let mut looped: agents::ActiveModel = clerk.clone().into();
        looped.manager_id = Set(Some(chief.id));
        looped.update(conn).await.unwrap();

        let cfg = config(true);
        let n1 = resolve_step_role(conn, &cfg, &StepRole::NPlus1, clerk.id).await.unwrap();
        expect!(n1.map(|a| a.id)).to_equal(Some(chief.id));
        let n2 = resolve_step_role(conn, &cfg, &StepRole::NPlus2, clerk.id).await.unwrap();
        expect!(n2).to_be_none();
    }
}
