//! Multi-agent fiction pipeline orchestration for Scriptorium.
//!
//! This crate runs ordered lists of generation steps (planner, plot architect,
//! world builder, character manager, writer, editor, continuity checker,
//! fixer) against a project's narrative state.
//!
//! # Features
//!
//! - **Context aggregation**: render a project snapshot into one deterministic prompt document
//! - **Cascading context**: inject dependency outputs into later steps
//! - **Streaming events**: forward agent chunks to the caller as they arrive
//! - **Run control**: pause, resume, cancel, and an escalation gate
//! - **Best-effort parsing**: consistency reports, foreshadowing and entity proposals
//! - **State appliers**: monotonic foreshadowing updates and de-duplicated entity inserts
//! - **Resume planning**: restart from the first incomplete step
//!
//! # Example
//!
//! ```rust,ignore
//! use scriptorium_pipeline::{
//!     InMemoryNarrativeStore, PipelineOrchestrator, PipelinePlan, PipelineRequest,
//!     ScriptoriumConfig,
//! };
//! use scriptorium_models::OpenAiCompatClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScriptoriumConfig::load()?;
//! let driver = Arc::new(OpenAiCompatClient::from_env(
//!     &config.provider.base_url,
//!     config.defaults.model.as_deref().unwrap_or("gpt-4o-mini"),
//!     "OPENAI_API_KEY",
//! )?);
//! let store = Arc::new(InMemoryNarrativeStore::new());
//! let orchestrator = PipelineOrchestrator::from_config(&config, store, driver)?;
//!
//! let (sink, mut events) = tokio::sync::mpsc::unbounded_channel();
//! let steps = PipelinePlan::from_file("chapter.toml")?.into_steps();
//! let request = PipelineRequest::new("project-1", steps);
//! let report = orchestrator.run(&request, sink).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod agent;
mod appliers;
mod config;
mod context;
mod escalation;
mod event;
mod extraction;
mod in_memory_store;
mod orchestrator;
mod parsers;
mod plan;
mod processor;
mod processors;
mod registry;
mod resume;
mod run;

pub use agent::{AgentOutput, AgentProfile, AgentRoster, AgentSettings, GenerationAgent};
pub use appliers::{ApplyReport, EntityExtractor, ForeshadowingUpdater, StatusChange, advance_status};
pub use config::{
    AgentConfig, EscalationConfig, ModelDefaults, ProviderConfig, RetryConfig, ScriptoriumConfig,
};
pub use context::{ContextAggregator, ContextOptions, render_context};
pub use escalation::{DEFAULT_ESCALATION_MARKER, EscalationDetector, detect_escalation};
pub use event::{EventSink, PipelineEvent};
pub use extraction::{extract_from_code_block, extract_json, parse_json};
pub use in_memory_store::InMemoryNarrativeStore;
pub use orchestrator::{
    CANCELLED_MESSAGE, PipelineOrchestrator, PipelineRequest, RunOutcome, RunReport, SpawnedRun,
    compose_step_context,
};
pub use parsers::{
    FALLBACK_NOTE_MAX_CHARS, ParseOutcome, ParseSource, classify_severity, parse_consistency,
    parse_foreshadowing_updates, parse_new_entities, truncate_note,
};
pub use plan::{PipelinePlan, TomlStep, validate_steps};
pub use processor::{ProcessorRegistry, StepContext, StepProcessor};
pub use processors::{
    ChapterDraftProcessor, ContinuityProcessor, EntityProcessor, ForeshadowingProcessor,
};
pub use registry::InMemoryRunRegistry;
pub use resume::{ResumePlan, TargetStatus};
pub use run::PipelineRun;
