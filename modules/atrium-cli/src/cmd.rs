use std::path::Path;

use anyhow::{Context, Result};
use atrium_access::{allowed_event_types, evaluate as route, load_workspace, EvaluationOptions, Subject, Workspace};
use atrium_common::{ActorId, AppConfig, EntityId, Scope};
use atrium_engine::{EventLog, MemoryEventLog, MutationIntent, MutationService};
use atrium_events::{catalog as event_catalog, render, DisplayHints, Event};
use atrium_projector::{EntitySnapshot, Projector};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

pub fn catalog(schemas: bool) -> Result<()> {
    let entries = event_catalog().list_event_types();
    if schemas {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    for info in entries {
        println!("{:<32} {}", info.key(), info.friendly_name);
    }
    Ok(())
}

pub fn allowed(config: &AppConfig, actor: ActorId, scope: &str) -> Result<()> {
    let workspace = workspace(config)?;
    let scope: Scope = scope.parse()?;
    let allowed = allowed_event_types(&workspace.bindings, actor, scope, &workspace.hierarchy);
    let keys: Vec<&str> = allowed.iter().map(|t| t.key()).collect();
    println!("{}", serde_json::to_string_pretty(&keys)?);
    Ok(())
}

pub fn evaluate(config: &AppConfig, actor: ActorId, event_type: &str, project: EntityId) -> Result<()> {
    let workspace = workspace(config)?;
    let event_type = event_catalog().resolve(event_type)?;
    let scope = Scope::Project(project);

    let permitted = allowed_event_types(&workspace.bindings, actor, scope, &workspace.hierarchy)
        .contains(&event_type);
    let evaluation = route(
        &Subject::new(event_type, actor, scope),
        &workspace.policies_for(scope, true),
        &workspace.hierarchy,
        &workspace.directory,
        options(config),
    );

    let out = json!({
        "permitted": permitted,
        "evaluation": evaluation,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub fn project(snapshot: &Path, events: &Path, viewer: Option<ActorId>, report: bool) -> Result<()> {
    let snapshot: EntitySnapshot = read_json(snapshot)?;
    let events: Vec<Event> = read_json(events)?;
    let projector = Projector::default();

    if report {
        let (_, report) = projector.project_with_report(&snapshot, &events);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let view = match viewer {
        Some(viewer) => projector.view_for(&snapshot, &events, viewer),
        None => projector.project(&snapshot, &events),
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

pub fn feed(events: &Path) -> Result<()> {
    let events: Vec<Event> = read_json(events)?;
    let rendered: Vec<_> = events.iter().map(render).collect();
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct IntentLine {
    actor: ActorId,
    event_type: String,
    payload: serde_json::Value,
    #[serde(default)]
    display: DisplayHints,
}

pub async fn simulate(config: &AppConfig, snapshot: &Path, intents: &Path) -> Result<()> {
    let workspace = workspace(config)?;
    let snapshot: EntitySnapshot = read_json(snapshot)?;
    let intents: Vec<IntentLine> = read_json(intents)?;
    let entity_id = snapshot.id;
    tracing::info!(%entity_id, intents = intents.len(), "Simulating mutations");

    let directory = workspace.directory.clone();
    let log = MemoryEventLog::new().with_snapshot(snapshot);
    let service = MutationService::new(log, workspace, directory).with_options(options(config));

    for line in intents {
        let intent = MutationIntent::builder()
            .entity_id(entity_id)
            .actor_id(line.actor)
            .event_type(line.event_type)
            .payload(line.payload)
            .display(line.display)
            .build();
        let out = match service.issue(intent).await {
            Ok(issued) => json!({
                "event_id": issued.event.id,
                "event_type": issued.event.event_type,
                "status": issued.event.status,
                "notify": issued.evaluation.notify,
                "approvers": issued.evaluation.approvers,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Intent refused");
                json!({ "error": e.to_string() })
            }
        };
        println!("{}", serde_json::to_string(&out)?);
    }

    let confirmed = service
        .log()
        .get_snapshot(entity_id)
        .await?
        .context("snapshot disappeared from the event log")?;
    let pending = service.log().list_pending_events(entity_id).await?;
    let out = json!({
        "confirmed": confirmed,
        "pending": pending.iter().map(render).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn workspace(config: &AppConfig) -> Result<Workspace> {
    load_workspace(&config.workspace_path, event_catalog())
}

fn options(config: &AppConfig) -> EvaluationOptions {
    EvaluationOptions {
        notify_actor: config.notify_actor,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
