//! Pipeline execution.
//!
//! The orchestrator drives a run's steps strictly in order. For each step it
//! merges the project context with the outputs of the step's dependencies,
//! streams the agent call into the event sink, stores the output, checks for
//! escalation and hands the output to the step processors.

use crate::{
    AgentRoster, ContextOptions, EscalationDetector, EventSink, InMemoryRunRegistry,
    PipelineEvent, PipelineRun, ProcessorRegistry, ResumePlan, ScriptoriumConfig, StepContext,
    TargetStatus, render_context, validate_steps,
};
use scriptorium_core::{Message, RunId, RunState, RunTarget, Step, StepOutput};
use scriptorium_error::{PipelineError, PipelineErrorKind, ScriptoriumResult};
use scriptorium_interface::{CompletionDriver, NarrativeStore, RunRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Message sent on the error channel when a run stops on a cancel request.
pub const CANCELLED_MESSAGE: &str = "Pipeline run cancelled";

/// Everything needed to start a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Project to read and write
    pub project_id: String,
    /// Chapter for chapter-scoped runs
    pub chapter_id: Option<String>,
    /// Steps in execution order
    pub steps: Vec<Step>,
    /// Outputs of steps already completed by an earlier run
    #[serde(default)]
    pub preloaded: BTreeMap<usize, StepOutput>,
}

impl PipelineRequest {
    /// A project-scoped request.
    pub fn new(project_id: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            project_id: project_id.into(),
            steps,
            ..Default::default()
        }
    }

    /// Narrows the request to one chapter.
    pub fn with_chapter(mut self, chapter_id: impl Into<String>) -> Self {
        self.chapter_id = Some(chapter_id.into());
        self
    }

    /// Marks steps as already completed.
    pub fn with_preloaded(mut self, preloaded: BTreeMap<usize, StepOutput>) -> Self {
        self.preloaded = preloaded;
        self
    }

    /// Project/chapter pair the run will occupy.
    pub fn target(&self) -> RunTarget {
        RunTarget::new(self.project_id.clone(), self.chapter_id.clone())
    }
}

/// How a run that did not fail ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunOutcome {
    /// Every step finished
    Completed,
    /// A cancel request stopped the run before its next step
    Cancelled,
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// The run
    pub run_id: RunId,
    /// How it ended
    pub outcome: RunOutcome,
    /// Every output, preloaded ones included
    pub outputs: BTreeMap<usize, StepOutput>,
}

/// A run executing on its own task.
#[derive(Debug)]
pub struct SpawnedRun {
    /// Handle for control calls and progress
    pub run: Arc<PipelineRun>,
    /// The run's event stream
    pub events: mpsc::UnboundedReceiver<PipelineEvent>,
    /// Resolves when the run ends
    pub task: JoinHandle<ScriptoriumResult<RunReport>>,
}

/// Executes pipeline runs against a narrative store.
///
/// Cheap to clone; clones share the store, agents, processors and the
/// live-run registry.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    store: Arc<dyn NarrativeStore>,
    roster: Arc<AgentRoster>,
    registry: Arc<dyn RunRegistry<PipelineRun>>,
    processors: Arc<ProcessorRegistry>,
    context_options: ContextOptions,
    escalation: EscalationDetector,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("agents", &self.roster.len())
            .field("processors", &self.processors.len())
            .field("context_options", &self.context_options)
            .field("escalation_marker", &self.escalation.marker())
            .finish()
    }
}

impl PipelineOrchestrator {
    /// Creates an orchestrator with the built-in processors, an in-memory run
    /// registry, default context options and the default escalation marker.
    pub fn new(store: Arc<dyn NarrativeStore>, roster: AgentRoster) -> Self {
        Self {
            processors: Arc::new(ProcessorRegistry::with_defaults(store.clone())),
            store,
            roster: Arc::new(roster),
            registry: Arc::new(InMemoryRunRegistry::new()),
            context_options: ContextOptions::default(),
            escalation: EscalationDetector::default(),
        }
    }

    /// Creates an orchestrator whose agents, context options and escalation
    /// marker come from `config`.
    ///
    /// # Errors
    ///
    /// Fails if the configured escalation marker is blank.
    pub fn from_config(
        config: &ScriptoriumConfig,
        store: Arc<dyn NarrativeStore>,
        driver: Arc<dyn CompletionDriver>,
    ) -> ScriptoriumResult<Self> {
        let roster = AgentRoster::from_config(config, driver);
        Ok(Self::new(store, roster)
            .with_context_options(config.context.clone())
            .with_escalation(EscalationDetector::new(&config.escalation.marker)?))
    }

    /// Replaces the live-run registry.
    pub fn with_registry(mut self, registry: Arc<dyn RunRegistry<PipelineRun>>) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the step processors.
    pub fn with_processors(mut self, processors: ProcessorRegistry) -> Self {
        self.processors = Arc::new(processors);
        self
    }

    /// Replaces the context options.
    pub fn with_context_options(mut self, options: ContextOptions) -> Self {
        self.context_options = options;
        self
    }

    /// Replaces the escalation detector.
    pub fn with_escalation(mut self, detector: EscalationDetector) -> Self {
        self.escalation = detector;
        self
    }

    /// The narrative store.
    pub fn store(&self) -> &Arc<dyn NarrativeStore> {
        &self.store
    }

    /// The configured agents.
    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    /// The live-run registry.
    pub fn registry(&self) -> &Arc<dyn RunRegistry<PipelineRun>> {
        &self.registry
    }

    /// Validates a request and registers an idle run for it.
    ///
    /// Preloaded outputs past the first missing step are discarded and those
    /// steps run again.
    ///
    /// # Errors
    ///
    /// Fails on an invalid plan, a role without an agent, or a target that
    /// already has a live run. Nothing is registered on failure.
    #[tracing::instrument(skip(self, request), fields(project_id = %request.project_id, steps = request.steps.len()))]
    pub async fn prepare(&self, request: &PipelineRequest) -> ScriptoriumResult<Arc<PipelineRun>> {
        let plan = ResumePlan::compute(request.steps.len(), request.preloaded.keys().copied());
        if !plan.discarded.is_empty() {
            tracing::warn!(
                discarded = ?plan.discarded,
                start_index = plan.start_index,
                "Preloaded outputs after the first incomplete step will be regenerated"
            );
        }
        let preloaded = plan.retain(&request.preloaded);
        let kept: BTreeSet<usize> = preloaded.keys().copied().collect();

        validate_steps(&request.steps, &kept)?;
        for (index, step) in request.steps.iter().enumerate() {
            if !kept.contains(&index) {
                self.roster.agent(step.role)?;
            }
        }

        let target = request.target();
        let run = Arc::new(PipelineRun::new(target.clone(), request.steps.clone(), preloaded));
        if !self.registry.add(run.id(), target.clone(), run.clone()).await {
            return Err(
                PipelineError::new(PipelineErrorKind::AlreadyRunning(target.to_string())).into(),
            );
        }

        tracing::info!(
            run_id = %run.id(),
            target = %target,
            start_index = plan.start_index,
            "Prepared pipeline run"
        );
        Ok(run)
    }

    /// Drives a prepared run to a terminal state.
    ///
    /// The run is removed from the registry however it ends. A cancelled run
    /// returns `Ok` with [`RunOutcome::Cancelled`] after emitting its error
    /// event.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyStarted` if the run was driven before, and otherwise
    /// the first fatal failure (agent call or context fetch), after emitting
    /// it as an error event and moving the run to `error`.
    #[tracing::instrument(skip(self, run, sink), fields(run_id = %run.id(), target = %run.target()))]
    pub async fn execute(
        &self,
        run: Arc<PipelineRun>,
        sink: EventSink,
    ) -> ScriptoriumResult<RunReport> {
        if !run.begin() {
            return Err(
                PipelineError::new(PipelineErrorKind::AlreadyStarted(run.id().to_string())).into(),
            );
        }
        tracing::info!(steps = run.steps().len(), "Pipeline run started");

        let result = self.drive(&run, &sink).await;
        self.registry.remove(&run.id()).await;

        match result {
            Ok(outcome) => {
                tracing::info!(outcome = %outcome, "Pipeline run finished");
                Ok(RunReport {
                    run_id: run.id(),
                    outcome,
                    outputs: run.outputs().await,
                })
            }
            Err(e) => {
                run.fail();
                let (step, _) = run.progress();
                tracing::error!(step, error = %e, "Pipeline run failed");
                emit(&sink, PipelineEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Prepares and executes a request on the current task.
    pub async fn run(
        &self,
        request: &PipelineRequest,
        sink: EventSink,
    ) -> ScriptoriumResult<RunReport> {
        let run = self.prepare(request).await?;
        self.execute(run, sink).await
    }

    /// Prepares a request and executes it on a new Tokio task.
    ///
    /// # Errors
    ///
    /// Only preparation errors are returned here; execution errors resolve
    /// through [`SpawnedRun::task`].
    pub async fn spawn(&self, request: &PipelineRequest) -> ScriptoriumResult<SpawnedRun> {
        let run = self.prepare(request).await?;
        let (sink, events) = mpsc::unbounded_channel();
        let orchestrator = self.clone();
        let task = tokio::spawn({
            let run = run.clone();
            async move { orchestrator.execute(run, sink).await }
        });
        Ok(SpawnedRun { run, events, task })
    }

    /// Removes a prepared run that will not be executed.
    ///
    /// Returns `false` if the run already started.
    pub async fn discard(&self, run: &PipelineRun) -> bool {
        if run.state() != RunState::Idle {
            return false;
        }
        self.registry.remove(&run.id()).await.is_some()
    }

    /// Looks up a live run.
    pub async fn get_run(&self, run_id: &RunId) -> Option<Arc<PipelineRun>> {
        self.registry.get(run_id).await
    }

    /// Pauses a live run. Returns whether the state changed.
    pub async fn pause_run(&self, run_id: &RunId) -> ScriptoriumResult<bool> {
        Ok(self.live_run(run_id).await?.pause())
    }

    /// Resumes a live run. Returns whether the state changed.
    pub async fn resume_run(&self, run_id: &RunId) -> ScriptoriumResult<bool> {
        Ok(self.live_run(run_id).await?.resume())
    }

    /// Cancels a live run. Returns whether the state changed.
    pub async fn cancel_run(&self, run_id: &RunId) -> ScriptoriumResult<bool> {
        Ok(self.live_run(run_id).await?.cancel())
    }

    /// Classifies a target from its persisted completions and live runs.
    pub async fn target_status(
        &self,
        target: &RunTarget,
        step_count: usize,
    ) -> ScriptoriumResult<TargetStatus> {
        let in_flight = self.registry.find_by_target(target).await.is_some();
        let completed = self.store.completed_steps(target).await?;
        Ok(TargetStatus::classify(
            step_count,
            completed.iter().map(|r| r.step_index),
            in_flight,
        ))
    }

    /// Fills a request's preloaded outputs from the store's completion
    /// records, up to the first incomplete step.
    pub async fn resume_request(
        &self,
        request: PipelineRequest,
    ) -> ScriptoriumResult<PipelineRequest> {
        let records = self.store.completed_steps(&request.target()).await?;
        let plan = ResumePlan::from_records(request.steps.len(), &records);
        tracing::info!(
            project_id = %request.project_id,
            start_index = plan.start_index,
            kept = plan.kept.len(),
            "Resuming from recorded completions"
        );
        let preloaded = plan.preloaded(&records);
        Ok(request.with_preloaded(preloaded))
    }

    async fn live_run(&self, run_id: &RunId) -> ScriptoriumResult<Arc<PipelineRun>> {
        self.registry.get(run_id).await.ok_or_else(|| {
            PipelineError::new(PipelineErrorKind::RunNotFound(run_id.to_string())).into()
        })
    }

    async fn drive(&self, run: &PipelineRun, sink: &EventSink) -> ScriptoriumResult<RunOutcome> {
        let steps = run.steps();
        let target = run.target();
        emit(sink, PipelineEvent::Plan {
            run_id: run.id(),
            steps: steps.to_vec(),
        });

        let snapshot = self.store.project_snapshot(&target.project_id).await?;
        let context = render_context(&snapshot, target.chapter_id.as_deref(), &self.context_options)?;
        let chapter_number = target
            .chapter_id
            .as_deref()
            .and_then(|id| snapshot.chapter(id))
            .map(|c| c.number);
        tracing::debug!(context_chars = context.len(), "Rendered project context");

        for (index, step) in steps.iter().enumerate() {
            if run.is_preloaded(index) {
                tracing::debug!(step = index, "Skipping preloaded step");
                continue;
            }
            if !checkpoint(run, sink, index).await {
                return Ok(cancelled(sink));
            }

            run.set_current_step(index);
            let agent = self.roster.agent(step.role)?;
            tracing::info!(step = index, role = %step.role, task = %step.task, "Starting step");
            emit(sink, PipelineEvent::StepStart {
                step: index,
                role: step.role,
            });

            let outputs = run.outputs().await;
            let messages = step_messages(&context, steps, index, &outputs);

            let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<String>();
            let call = agent.execute(&messages, Some(chunk_tx));
            let forward = async {
                while let Some(text) = chunk_rx.recv().await {
                    emit(sink, PipelineEvent::StepStreamChunk {
                        step: index,
                        role: step.role,
                        text,
                    });
                }
            };
            let (result, ()) = tokio::join!(call, forward);
            let generated = result?;

            let output = StepOutput::new(step.role, generated.text, generated.usage);
            run.store_output(index, output.clone()).await;
            emit(sink, PipelineEvent::step_complete(index, &output));
            tracing::info!(
                step = index,
                role = %step.role,
                input_tokens = *output.usage.input_tokens(),
                output_tokens = *output.usage.output_tokens(),
                "Step complete"
            );

            if self.escalation.detect(&output.text) {
                // A run cancelled mid-step does not escalate.
                if run.escalate() || run.state() == RunState::Paused {
                    tracing::info!(step = index, role = %step.role, "Escalation requested, pausing run");
                    emit(sink, PipelineEvent::EscalationRequired {
                        step: index,
                        role: step.role,
                        raw_text: output.text.clone(),
                    });
                } else {
                    tracing::info!(step = index, state = %run.state(), "Ignoring escalation of a stopped run");
                }
            }

            if let Err(e) = self.store.record_step_completion(target, index, &output).await {
                tracing::warn!(step = index, error = %e, "Failed to record step completion");
            }

            let step_context = StepContext {
                run_id: run.id(),
                target,
                chapter_number,
                step_index: index,
                step,
                output: &output,
            };
            if let Err(e) = self.processors.process(&step_context).await {
                tracing::warn!(step = index, error = %e, "Step processing failed, continuing run");
            }
        }

        if !checkpoint(run, sink, steps.len()).await || !run.complete() {
            return Ok(cancelled(sink));
        }
        emit(sink, PipelineEvent::Completed { run_id: run.id() });
        Ok(RunOutcome::Completed)
    }
}

/// Waits out a pause before `next_step`. Returns `false` if the run may not
/// continue.
async fn checkpoint(run: &PipelineRun, sink: &EventSink, next_step: usize) -> bool {
    if run.state() == RunState::Paused {
        tracing::info!(step = next_step, "Run paused");
        emit(sink, PipelineEvent::Paused { step: next_step });
    }
    match run.checkpoint().await {
        RunState::Running => true,
        state => {
            tracing::info!(step = next_step, state = %state, "Run stopped before step");
            false
        }
    }
}

fn cancelled(sink: &EventSink) -> RunOutcome {
    emit(sink, PipelineEvent::Error {
        message: CANCELLED_MESSAGE.to_string(),
    });
    RunOutcome::Cancelled
}

fn emit(sink: &EventSink, event: PipelineEvent) {
    if sink.send(event).is_err() {
        tracing::debug!("Event receiver dropped");
    }
}

/// Builds the context block for step `index`: the project context followed
/// by one labelled section per dependency output, in declared order.
///
/// Dependencies without an output are left out.
pub fn compose_step_context(
    context: &str,
    steps: &[Step],
    index: usize,
    outputs: &BTreeMap<usize, StepOutput>,
) -> String {
    let mut sections = Vec::new();
    if !context.trim().is_empty() {
        sections.push(context.trim_end().to_string());
    }

    let dependencies = steps.get(index).map(|s| s.depends_on.as_slice()).unwrap_or_default();
    for &dependency in dependencies {
        let (Some(source), Some(output)) = (steps.get(dependency), outputs.get(&dependency)) else {
            continue;
        };
        sections.push(format!(
            "## Output from step {} ({}: {})\n\n{}",
            dependency,
            source.role.label(),
            source.task,
            output.text.trim_end()
        ));
    }
    sections.join("\n\n")
}

fn step_messages(
    context: &str,
    steps: &[Step],
    index: usize,
    outputs: &BTreeMap<usize, StepOutput>,
) -> Vec<Message> {
    let Some(step) = steps.get(index) else {
        return Vec::new();
    };

    let mut text = compose_step_context(context, steps, index, outputs);
    if step.messages.is_empty() {
        let mut task = format!("## Task\n\n{}", step.task);
        if !step.description.trim().is_empty() {
            task.push_str("\n\n");
            task.push_str(step.description.trim());
        }
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&task);
    }

    let mut messages = Vec::with_capacity(step.messages.len() + 1);
    if !text.is_empty() {
        messages.push(Message::user(text));
    }
    messages.extend(step.messages.iter().cloned());
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::{AgentRole, Role, TokenUsage};

    fn outputs(entries: &[(usize, &str)]) -> BTreeMap<usize, StepOutput> {
        entries
            .iter()
            .map(|(i, text)| (*i, StepOutput::new(AgentRole::Planner, *text, TokenUsage::default())))
            .collect()
    }

    #[test]
    fn dependency_sections_follow_declared_order() {
        let steps = vec![
            Step::new(AgentRole::Planner, "outline", ""),
            Step::new(AgentRole::WorldBuilder, "setting", ""),
            Step::new(AgentRole::Writer, "draft", "").depends_on([1, 0]),
        ];
        let text = compose_step_context("# Context", &steps, 2, &outputs(&[(0, "A"), (1, "B")]));

        let b = text.find("## Output from step 1 (World Builder: setting)\n\nB").unwrap();
        let a = text.find("## Output from step 0 (Planner: outline)\n\nA").unwrap();
        assert!(text.starts_with("# Context"));
        assert!(b < a);
    }

    #[test]
    fn steps_without_messages_get_a_task_section() {
        let steps = vec![Step::new(AgentRole::Planner, "outline", "Outline the book.")];
        let messages = step_messages("", &steps, 0, &BTreeMap::new());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "## Task\n\noutline\n\nOutline the book.");
    }

    #[test]
    fn explicit_messages_follow_the_context() {
        let steps = vec![
            Step::new(AgentRole::Writer, "draft", "").with_message(Message::user("Write it.")),
        ];
        let messages = step_messages("# Context", &steps, 0, &BTreeMap::new());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "# Context");
        assert_eq!(messages[1].content, "Write it.");
    }

    #[test]
    fn request_target_carries_chapter() {
        let request = PipelineRequest::new("p1", Vec::new()).with_chapter("c3");
        assert_eq!(request.target(), RunTarget::new("p1", Some("c3".into())));
    }
}
