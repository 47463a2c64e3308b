use std::path::PathBuf;

use anyhow::Result;
use atrium_common::AppConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod cmd;

#[derive(Parser)]
#[command(name = "atrium", about = "Event catalog, access and projection tooling")]
#[command(version)]
struct Cli {
    /// Workspace TOML file (overrides ATRIUM_WORKSPACE)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered event types
    Catalog {
        /// Include each payload's JSON schema
        #[arg(long)]
        schemas: bool,
    },

    /// Event types an actor may emit at a scope
    Allowed {
        #[arg(long)]
        actor: Uuid,
        /// `project:<uuid>` or `organisation:<uuid>`
        #[arg(long)]
        scope: String,
    },

    /// Route an event through the workspace policies
    Evaluate {
        #[arg(long)]
        actor: Uuid,
        #[arg(long)]
        event_type: String,
        #[arg(long)]
        project: Uuid,
    },

    /// Fold pending events from a JSON file onto a snapshot
    Project {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        events: PathBuf,
        /// Only fold this actor's own events
        #[arg(long)]
        viewer: Option<Uuid>,
        /// Print per-event outcomes instead of the view
        #[arg(long)]
        report: bool,
    },

    /// Render events from a JSON file as a change feed
    Feed {
        #[arg(long)]
        events: PathBuf,
    },

    /// Run mutation intents through the full issue path against a snapshot
    Simulate {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        intents: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.workspace {
        config.workspace_path = path;
    }

    init_tracing(cli.json || config.log_json);
    config.log_settings();

    match cli.command {
        Commands::Catalog { schemas } => cmd::catalog(schemas),
        Commands::Allowed { actor, scope } => cmd::allowed(&config, actor, &scope),
        Commands::Evaluate {
            actor,
            event_type,
            project,
        } => cmd::evaluate(&config, actor, &event_type, project),
        Commands::Project {
            snapshot,
            events,
            viewer,
            report,
        } => cmd::project(&snapshot, &events, viewer, report),
        Commands::Feed { events } => cmd::feed(&events),
        Commands::Simulate { snapshot, intents } => {
            cmd::simulate(&config, &snapshot, &intents).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("atrium=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
