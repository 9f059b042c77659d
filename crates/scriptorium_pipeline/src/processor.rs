//! Post-step processing traits and registry.
//!
//! Processors run after a step completes to turn its output into narrative
//! state changes (foreshadowing, entities, chapter drafts).

use async_trait::async_trait;
use scriptorium_core::{RunId, RunTarget, Step, StepOutput};
use scriptorium_error::{PipelineError, PipelineErrorKind, ScriptoriumResult};

/// Context provided to processors for one completed step.
#[derive(Debug, Clone)]
pub struct StepContext<'a> {
    /// Run the step belongs to
    pub run_id: RunId,
    /// Project/chapter the run writes to
    pub target: &'a RunTarget,
    /// Number of the target chapter, for chapter-scoped runs
    pub chapter_number: Option<u32>,
    /// Index of the step in the plan
    pub step_index: usize,
    /// The step definition
    pub step: &'a Step,
    /// What the step produced
    pub output: &'a StepOutput,
}

/// Trait for processing completed steps.
///
/// # Example
///
/// ```rust,ignore
/// use scriptorium_pipeline::{StepProcessor, StepContext};
/// use scriptorium_error::ScriptoriumResult;
/// use async_trait::async_trait;
///
/// struct WordCount;
///
/// #[async_trait]
/// impl StepProcessor for WordCount {
///     async fn process(&self, context: &StepContext<'_>) -> ScriptoriumResult<()> {
///         tracing::info!(words = context.output.text.split_whitespace().count());
///         Ok(())
///     }
///
///     fn should_process(&self, context: &StepContext<'_>) -> bool {
///         context.step.role.produces_prose()
///     }
///
///     fn name(&self) -> &str {
///         "WordCount"
///     }
/// }
/// ```
#[async_trait]
pub trait StepProcessor: Send + Sync {
    /// Process a completed step.
    ///
    /// # Errors
    ///
    /// Processor errors are logged and collected; they never fail the run.
    async fn process(&self, context: &StepContext<'_>) -> ScriptoriumResult<()>;

    /// Whether this processor handles the step.
    fn should_process(&self, context: &StepContext<'_>) -> bool;

    /// Name used in logs and error messages.
    fn name(&self) -> &str;
}

/// Registry of step processors.
///
/// Every processor whose `should_process` accepts a step is called, in
/// registration order.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn StepProcessor>>,
}

impl ProcessorRegistry {
    /// Create a new empty processor registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new processor.
    pub fn register(&mut self, processor: Box<dyn StepProcessor>) {
        self.processors.push(processor);
    }

    /// Runs all matching processors, continuing past failures.
    ///
    /// # Errors
    ///
    /// Returns one error listing every failed processor.
    pub async fn process(&self, context: &StepContext<'_>) -> ScriptoriumResult<()> {
        let mut errors = Vec::new();

        for processor in &self.processors {
            if !processor.should_process(context) {
                continue;
            }
            match processor.process(context).await {
                Ok(()) => tracing::debug!(
                    processor = processor.name(),
                    step = context.step_index,
                    "Processor succeeded"
                ),
                Err(e) => {
                    tracing::warn!(
                        processor = processor.name(),
                        step = context.step_index,
                        error = %e,
                        "Processor failed"
                    );
                    errors.push(format!("{}: {}", processor.name(), e));
                }
            }
        }

        if !errors.is_empty() {
            return Err(PipelineError::new(PipelineErrorKind::ProcessorFailed(errors.join("; "))).into());
        }
        Ok(())
    }

    /// Get the number of registered processors.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Names of the registered processors, in order.
    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }
}
