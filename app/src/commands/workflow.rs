use circuit::workflow::store;
use circuit::{CircuitError, PreviewStepKind, RequestTransitions, Resolver, WorkflowConfigService, DB};
use console::style;

pub async fn init() -> Result<(), CircuitError> {
    let service = WorkflowConfigService::new()?;
    let templates = service.initialize_system_workflows().await?;

    for template in &templates {
        println!(
            "{} {} {}",
            style("✓").green(),
            style(&template.code).bold(),
            style(&template.name).dim()
        );
    }
    Ok(())
}

pub async fn list(include_inactive: bool) -> Result<(), CircuitError> {
    let service = WorkflowConfigService::new()?;

    for template in service.list_templates(include_inactive).await? {
        let steps = service.template_steps(template.id).await?;
        let mut flags = Vec::new();
        if template.is_system {
            flags.push("system");
        }
        if !template.active {
            flags.push("retired");
        }

        println!(
            "{} {:<24} {:<10} {} step(s) {}",
            template.icon,
            style(&template.code).bold(),
            template.direction,
            steps.len(),
            style(flags.join(", ")).dim()
        );
    }
    Ok(())
}

pub async fn preview(code: &str, json: bool) -> Result<(), CircuitError> {
    let service = WorkflowConfigService::new()?;
    let template = service
        .find_template_by_code(code)
        .await?
        .ok_or_else(|| CircuitError::not_found("WorkflowTemplate", code))?;
    let preview = service.workflow_preview(template.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    println!("{} {} ({})", preview.icon, style(&preview.name).bold(), preview.code);
    if let Some(description) = &preview.description {
        println!("  {}", style(description).dim());
    }
    for step in &preview.steps {
        let marker = match step.kind {
            PreviewStepKind::Requester => style("●").cyan(),
            PreviewStepKind::Approval => style("○").yellow(),
            PreviewStepKind::Archive => style("■").green(),
        };
        let state = step.state.map(|s| s.as_str()).unwrap_or("-");
        let mut notes = Vec::new();
        if step.kind == PreviewStepKind::Approval {
            if !step.mandatory {
                notes.push("optional".to_string());
            }
            if !step.can_reject {
                notes.push("cannot reject".to_string());
            }
            if let Some(days) = step.deadline_days {
                notes.push(format!("{} day(s)", days));
            }
        }
        println!(
            "  {} {:>2}. {:<28} {:<14} {}",
            marker,
            step.position,
            step.label,
            state,
            style(notes.join(", ")).dim()
        );
    }
    Ok(())
}

pub async fn circuit(request_id: i64) -> Result<(), CircuitError> {
    let db = DB::connection()?;
    let resolver = Resolver::new(db.inner());
    let request = store::get_request(db.inner(), request_id).await?;

    let circuit = resolver.circuit(&request).await?;
    let current = request.state()?;
    let frozen = resolver.snapshot_for(&request)?.is_some();

    println!(
        "Request #{} ({}){}",
        request.id,
        request.type_code,
        if frozen { " [frozen]" } else { "" }
    );
    let states: Vec<String> = circuit
        .iter()
        .map(|s| {
            if *s == current {
                style(format!("[{}]", s)).bold().to_string()
            } else {
                s.to_string()
            }
        })
        .collect();
    println!("  {}", states.join(" → "));

    match resolver.next_state(&request).await? {
        Some(next) => {
            let validator = resolver
                .expected_validator(&request, next)
                .await?
                .map(|a| format!("{} (agent #{})", a.full_name(), a.id))
                .unwrap_or_else(|| "any agent".to_string());
            println!("  next: {} by {}", style(next.label()).cyan(), validator);
        }
        None if current.is_terminal() => {
            println!("  {}", style(format!("{} (closed)", current.label())).dim())
        }
        None => println!("  {}", style("no further transition").dim()),
    }
    Ok(())
}

pub async fn pending(user_id: i64) -> Result<(), CircuitError> {
    let db = DB::connection()?;
    let resolver = Resolver::new(db.inner());
    let pending = resolver.pending_requests_for_user(user_id).await?;

    if pending.is_empty() {
        println!("{}", style("Nothing pending").dim());
        return Ok(());
    }
    for request in &pending {
        let next = resolver
            .next_state(request)
            .await?
            .map(|s| s.as_str())
            .unwrap_or("-");
        println!(
            "  #{:<6} {:<20} {} → {}",
            request.id, request.type_code, request.current_state, next
        );
    }
    Ok(())
}

pub async fn freeze(request_id: i64) -> Result<(), CircuitError> {
    let transitions = RequestTransitions::new()?;

    match transitions.freeze_circuit(request_id).await? {
        Some(snapshot) => println!(
            "{} Request #{} follows {} ({} step(s))",
            style("✓").green(),
            request_id,
            snapshot.template_code,
            snapshot.steps.len()
        ),
        None => println!(
            "{} Request #{} has no active request type; it keeps the fallback circuit",
            style("!").yellow(),
            request_id
        ),
    }
    Ok(())
}
