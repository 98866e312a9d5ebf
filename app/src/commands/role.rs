use chrono::NaiveDate;
use circuit::workflow::store;
use circuit::{CircuitError, NewCustomRole, RoleDirectory, WorkflowConfigService, DB};
use console::style;

pub async fn create(
    code: String,
    label: String,
    description: Option<String>,
    actor: Option<i64>,
) -> Result<(), CircuitError> {
    let service = WorkflowConfigService::new()?;
    let mut input = NewCustomRole::new(code, label);
    if let Some(description) = description {
        input = input.description(description);
    }

    let role = service.create_custom_role(input, actor).await?;
    println!("{} Role {} created (#{})", style("✓").green(), style(&role.code).bold(), role.id);
    Ok(())
}

pub async fn assign(
    code: &str,
    agent_id: i64,
    until: Option<&str>,
    actor: Option<i64>,
) -> Result<(), CircuitError> {
    let service = WorkflowConfigService::new()?;
    let role = store::find_custom_role_by_code(service.connection().inner(), code)
        .await?
        .ok_or_else(|| CircuitError::not_found("CustomRole", code))?;
    let ends_at = until.map(parse_last_day).transpose()?;

    let assignment = service.assign_role(role.id, agent_id, ends_at, actor).await?;
    println!(
        "{} Agent #{} holds {} (assignment #{})",
        style("✓").green(),
        agent_id,
        style(&role.code).bold(),
        assignment.id
    );
    Ok(())
}

pub async fn end(assignment_id: i64, actor: Option<i64>) -> Result<(), CircuitError> {
    let service = WorkflowConfigService::new()?;
    let assignment = service.end_assignment(assignment_id, actor).await?;
    println!(
        "{} Assignment #{} of agent #{} ended",
        style("✓").green(),
        assignment.id,
        assignment.agent_id
    );
    Ok(())
}

pub async fn list() -> Result<(), CircuitError> {
    let service = WorkflowConfigService::new()?;
    let db = DB::connection()?;
    let directory = RoleDirectory::with_tie_break(db.inner(), service.config().role_tie_break);

    for role in service.list_custom_roles(true).await? {
        let holders = directory.holders(&role.code).await?;
        let names: Vec<String> = holders
            .iter()
            .map(|h| format!("{} (#{})", h.agent.full_name(), h.agent.id))
            .collect();
        let status = if role.active { "" } else { " [retired]" };

        println!("{:<20} {}{}", style(&role.code).bold(), role.label, style(status).dim());
        if names.is_empty() {
            println!("    {}", style("no holder").dim());
        } else {
            println!("    {}", names.join(", "));
        }
    }
    Ok(())
}

/// Assignment runs through the whole given day
fn parse_last_day(value: &str) -> Result<chrono::NaiveDateTime, CircuitError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(23, 59, 59))
        .ok_or_else(|| CircuitError::validation("until", "Expected a date as YYYY-MM-DD"))
}
