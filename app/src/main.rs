mod bootstrap;
mod commands;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "circuit")]
#[command(about = "Administer approval circuits, custom roles and their audit log", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Directory holding the .env files
    #[arg(long, global = true, default_value = ".")]
    project_root: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all pending database migrations
    Migrate,
    /// Rollback the last database migration(s)
    #[command(name = "migrate:rollback")]
    MigrateRollback {
        /// Number of migrations to rollback
        #[arg(long, default_value = "1")]
        step: u32,
    },
    /// Show the status of all migrations
    #[command(name = "migrate:status")]
    MigrateStatus,
    /// Drop all tables and re-run all migrations
    #[command(name = "migrate:fresh")]
    MigrateFresh,
    /// Create the built-in system templates that are missing
    #[command(name = "workflow:init")]
    WorkflowInit,
    /// List workflow templates
    #[command(name = "workflow:list")]
    WorkflowList {
        /// Include retired templates
        #[arg(long)]
        all: bool,
    },
    /// Show the steps of a template
    #[command(name = "workflow:preview")]
    WorkflowPreview {
        /// Template code (e.g., CIRCUIT_MOYEN)
        code: String,

        /// Print the preview as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the circuit, next state and expected validator of a request
    #[command(name = "workflow:circuit")]
    WorkflowCircuit {
        /// Request id
        request_id: i64,
    },
    /// List open requests a user may move forward
    #[command(name = "workflow:pending")]
    WorkflowPending {
        /// User id of the validator
        #[arg(long, short = 'u')]
        user: i64,
    },
    /// Freeze the current configuration into a request
    #[command(name = "workflow:freeze")]
    WorkflowFreeze {
        /// Request id
        request_id: i64,
    },
    /// Create a custom role
    #[command(name = "role:create")]
    RoleCreate {
        /// Role code (e.g., RESP_BUDGET)
        code: String,

        /// Display label
        label: String,

        #[arg(long)]
        description: Option<String>,

        /// User id recorded in the audit log
        #[arg(long)]
        actor: Option<i64>,
    },
    /// Assign a custom role to an agent
    #[command(name = "role:assign")]
    RoleAssign {
        /// Role code
        code: String,

        /// Agent id
        agent_id: i64,

        /// Last day of the assignment (YYYY-MM-DD), open-ended if omitted
        #[arg(long)]
        until: Option<String>,

        #[arg(long)]
        actor: Option<i64>,
    },
    /// End a role assignment now
    #[command(name = "role:end")]
    RoleEnd {
        /// Assignment id
        assignment_id: i64,

        #[arg(long)]
        actor: Option<i64>,
    },
    /// List custom roles and their current holders
    #[command(name = "role:list")]
    RoleList,
    /// Show the configuration audit log, newest first
    History {
        /// Number of entries
        #[arg(long, short = 'n', default_value = "20")]
        limit: u64,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().without_time().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    if let Err(e) = bootstrap::boot(&cli.project_root).await {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::MigrateRollback { step } => commands::migrate::rollback(step).await,
        Commands::MigrateStatus => commands::migrate::status().await,
        Commands::MigrateFresh => commands::migrate::fresh().await,
        Commands::WorkflowInit => commands::workflow::init().await,
        Commands::WorkflowList { all } => commands::workflow::list(all).await,
        Commands::WorkflowPreview { code, json } => commands::workflow::preview(&code, json).await,
        Commands::WorkflowCircuit { request_id } => commands::workflow::circuit(request_id).await,
        Commands::WorkflowPending { user } => commands::workflow::pending(user).await,
        Commands::WorkflowFreeze { request_id } => commands::workflow::freeze(request_id).await,
        Commands::RoleCreate {
            code,
            label,
            description,
            actor,
        } => commands::role::create(code, label, description, actor).await,
        Commands::RoleAssign {
            code,
            agent_id,
            until,
            actor,
        } => commands::role::assign(&code, agent_id, until.as_deref(), actor).await,
        Commands::RoleEnd {
            assignment_id,
            actor,
        } => commands::role::end(assignment_id, actor).await,
        Commands::RoleList => commands::role::list().await,
        Commands::History { limit } => commands::history::run(limit).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        if let circuit::CircuitError::Validation(errors) = &e {
            for (field, messages) in &errors.errors {
                for message in messages {
                    eprintln!("  {} {}", style(field).yellow(), message);
                }
            }
        }
        std::process::exit(1);
    }
}
