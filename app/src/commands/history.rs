use circuit::{CircuitError, HistoryAction, WorkflowConfigService};
use console::style;

pub async fn run(limit: u64) -> Result<(), CircuitError> {
    let service = WorkflowConfigService::new()?;

    for entry in service.recent_history(limit).await? {
        let action = match entry.action() {
            Some(HistoryAction::Delete) => style(format!("{:<10}", entry.action)).red(),
            Some(HistoryAction::Deactivate) => style(format!("{:<10}", entry.action)).yellow(),
            _ => style(format!("{:<10}", entry.action)),
        };
        println!(
            "{} {} {:<22} #{:<6} by {}",
            style(entry.performed_at.format("%Y-%m-%d %H:%M:%S")).dim(),
            action,
            entry.entity_type,
            entry.entity_id,
            entry.performed_by
        );
        if let Some(changes) = &entry.changes {
            println!("    {}", style(changes).dim());
        }
    }
    Ok(())
}
