//! Scriptorium - multi-agent LLM fiction pipeline
//!
//! Scriptorium chains specialised language-model agents (planner, plot
//! architect, world builder, character manager, writer, editor, continuity
//! checker, fixer) over a novel project's narrative state. Each step sees a
//! rendered context of the project plus the outputs of the steps it depends
//! on, and continuity and foreshadowing findings flow back into the project.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use scriptorium::{
//!     InMemoryNarrativeStore, OpenAiCompatClient, PipelineOrchestrator, PipelinePlan,
//!     PipelineRequest, ScriptoriumConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScriptoriumConfig::load()?;
//!     let driver = Arc::new(OpenAiCompatClient::from_env(
//!         &config.provider.base_url,
//!         "gpt-4o-mini",
//!         "OPENAI_API_KEY",
//!     )?);
//!     let store = Arc::new(InMemoryNarrativeStore::new());
//!     let orchestrator = PipelineOrchestrator::from_config(&config, store, driver)?;
//!
//!     let plan = PipelinePlan::from_file("chapter.toml")?;
//!     let request = PipelineRequest::new("project-1", plan.into_steps()).with_chapter("ch-3");
//!     let mut spawned = orchestrator.spawn(&request).await?;
//!     while let Some(event) = spawned.events.recv().await {
//!         println!("{}", serde_json::to_string(&event)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `scriptorium_error` - Error types
//! - `scriptorium_core` - Core data types (roles, messages, narrative entities, steps)
//! - `scriptorium_interface` - `CompletionDriver`, `NarrativeStore` and `RunRegistry` traits
//! - `scriptorium_models` - OpenAI-compatible completion client
//! - `scriptorium_pipeline` - Orchestration, context, parsing and state appliers
//!
//! This crate re-exports everything for convenience and adds tracing setup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod observability;

pub use observability::{ObservabilityConfig, init_tracing};

pub use scriptorium_core::*;
pub use scriptorium_error::*;
pub use scriptorium_interface::*;
pub use scriptorium_models::OpenAiCompatClient;
pub use scriptorium_pipeline::*;
