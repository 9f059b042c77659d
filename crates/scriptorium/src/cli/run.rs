//! Pipeline execution command handler.

use super::RunArgs;
use scriptorium::{
    CompletionDriver, CompletionError, CompletionErrorKind, ConfigError, InMemoryNarrativeStore,
    JsonError, OpenAiCompatClient, PipelineError, PipelineErrorKind, PipelineEvent,
    PipelineOrchestrator, PipelinePlan, PipelineRequest, ProjectSnapshot, RunOutcome,
    ScriptoriumConfig, ScriptoriumResult, StepOutput, StoreError, StoreErrorKind,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Runs a plan against a project snapshot held in memory.
///
/// Events are written to stdout as JSON lines. The first Ctrl-C cancels the
/// run; the cancellation is observed before the next step starts.
pub async fn run_pipeline(args: &RunArgs) -> ScriptoriumResult<()> {
    let config = load_config(args.config.as_deref())?;
    let plan = PipelinePlan::from_file(&args.plan)?;
    let snapshot: ProjectSnapshot = read_json(&args.project)?;

    info!(
        plan = plan.name.as_deref().unwrap_or("unnamed"),
        project_id = %snapshot.project_id,
        steps = plan.steps.len(),
        "Loaded pipeline plan"
    );

    let store = Arc::new(InMemoryNarrativeStore::new());
    let project_id = snapshot.project_id.clone();
    store.insert_project(snapshot).await;

    let orchestrator = PipelineOrchestrator::from_config(&config, store, build_driver(&config)?)?;

    let mut request = PipelineRequest::new(project_id, plan.into_steps());
    if let Some(chapter) = &args.chapter {
        request = request.with_chapter(chapter.clone());
    }
    if let Some(path) = &args.resume_from {
        let preloaded: BTreeMap<usize, StepOutput> = read_json(path)?;
        info!(steps = preloaded.len(), "Loaded outputs to resume from");
        request = request.with_preloaded(preloaded);
    }

    let mut spawned = orchestrator.spawn(&request).await?;
    let run = spawned.run.clone();

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = spawned.events.recv() => match event {
                Some(event) => print_event(&event)?,
                None => break,
            },
            signal = &mut interrupt, if !interrupted => {
                interrupted = true;
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for interrupt");
                    continue;
                }
                warn!(run_id = %run.id(), "Interrupt received, cancelling run");
                run.cancel();
            }
        }
    }

    let report = match spawned.task.await {
        Ok(result) => result?,
        Err(e) => {
            return Err(PipelineError::new(PipelineErrorKind::TaskFailed(e.to_string())).into());
        }
    };

    let total_tokens: u64 = report.outputs.values().map(|o| o.usage.total()).sum();
    info!(
        run_id = %report.run_id,
        outcome = %report.outcome,
        steps = report.outputs.len(),
        total_tokens,
        "Pipeline run ended"
    );

    if let Some(path) = &args.save_outputs {
        let json = serde_json::to_string_pretty(&report.outputs)
            .map_err(|e| JsonError::new(format!("Failed to serialize outputs: {}", e)))?;
        std::fs::write(path, json).map_err(|e| {
            StoreError::new(StoreErrorKind::Backend(format!("{}: {}", path.display(), e)))
        })?;
        info!(path = %path.display(), "Saved step outputs");
    }

    if report.outcome == RunOutcome::Cancelled {
        warn!("Run cancelled; resume with --resume-from using the saved outputs");
    }
    Ok(())
}

/// Explicit file if given, otherwise the layered search.
pub(crate) fn load_config(path: Option<&Path>) -> ScriptoriumResult<ScriptoriumConfig> {
    match path {
        Some(path) => ScriptoriumConfig::from_file(path),
        None => ScriptoriumConfig::load(),
    }
}

/// Reads and deserializes a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> ScriptoriumResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        StoreError::new(StoreErrorKind::Backend(format!("{}: {}", path.display(), e)))
    })?;
    Ok(serde_json::from_str(&content)
        .map_err(|e| JsonError::new(format!("{}: {}", path.display(), e)))?)
}

fn build_driver(config: &ScriptoriumConfig) -> ScriptoriumResult<Arc<dyn CompletionDriver>> {
    let model = config.defaults.model.as_deref().ok_or_else(|| {
        ConfigError::new("No default model configured; set [defaults] model")
    })?;
    let api_key = match &config.provider.api_key_env {
        Some(var) => Some(std::env::var(var).map_err(|_| {
            CompletionError::new(CompletionErrorKind::MissingApiKey(var.clone()))
        })?),
        None => None,
    };
    let client = OpenAiCompatClient::with_timeout(
        &config.provider.base_url,
        model,
        api_key,
        Duration::from_secs(config.provider.timeout_secs),
    )?;
    Ok(Arc::new(client))
}

fn print_event(event: &PipelineEvent) -> ScriptoriumResult<()> {
    let line = serde_json::to_string(event)
        .map_err(|e| JsonError::new(format!("Failed to serialize {} event: {}", event.name(), e)))?;
    println!("{}", line);
    Ok(())
}
