//! Step lists loaded from TOML and validated before execution.
//!
//! ```toml
//! name = "chapter"
//!
//! [[steps]]
//! role = "planner"
//! task = "outline"
//! prompt = "Outline chapter 3."
//!
//! [[steps]]
//! role = "writer"
//! task = "draft"
//! depends_on = [0]
//!
//! [[steps.messages]]
//! role = "user"
//! content = "Write the chapter from the outline."
//! ```

use scriptorium_core::{AgentRole, Message, Step};
use scriptorium_error::{PipelineError, PipelineErrorKind, ScriptoriumResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, instrument};

/// A step as written in a plan file.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlStep {
    /// Agent role
    pub role: AgentRole,
    /// Short task label
    pub task: String,
    /// Human description
    #[serde(default)]
    pub description: String,
    /// Dependency indices, in the order their outputs are injected
    #[serde(default)]
    pub depends_on: Vec<usize>,
    /// Shorthand for a single user message, placed before `messages`
    pub prompt: Option<String>,
    /// Explicit prompt messages
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl From<TomlStep> for Step {
    fn from(toml: TomlStep) -> Self {
        let mut step = Step::new(toml.role, toml.task, toml.description).depends_on(toml.depends_on);
        if let Some(prompt) = toml.prompt {
            step = step.with_message(Message::user(prompt));
        }
        step.messages.extend(toml.messages);
        step
    }
}

/// A named step list.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelinePlan {
    /// Plan name
    #[serde(default)]
    pub name: Option<String>,
    /// What the plan produces
    #[serde(default)]
    pub description: Option<String>,
    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<TomlStep>,
}

impl PipelinePlan {
    /// Parses and validates a plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanParse` for malformed TOML and the validation errors of
    /// [`validate_steps`].
    #[instrument(skip(toml), fields(toml_len = toml.len()))]
    pub fn from_toml_str(toml: &str) -> ScriptoriumResult<Self> {
        let plan: PipelinePlan = toml::from_str(toml)
            .map_err(|e| PipelineError::new(PipelineErrorKind::PlanParse(e.to_string())))?;
        plan.validate()?;
        debug!(name = ?plan.name, steps = plan.steps.len(), "Parsed pipeline plan");
        Ok(plan)
    }

    /// Reads, parses and validates a plan file.
    pub fn from_file(path: impl AsRef<Path>) -> ScriptoriumResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::new(PipelineErrorKind::PlanParse(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        Self::from_toml_str(&content)
    }

    /// Validates the plan with no preloaded steps.
    pub fn validate(&self) -> ScriptoriumResult<()> {
        let steps: Vec<Step> = self.steps.iter().cloned().map(Step::from).collect();
        validate_steps(&steps, &BTreeSet::new())
    }

    /// Converts into executable steps.
    pub fn into_steps(self) -> Vec<Step> {
        self.steps.into_iter().map(Step::from).collect()
    }
}

/// Checks that every dependency can have completed before its step runs.
///
/// A dependency must name an earlier step, or a later one whose output is
/// `preloaded`. Self-dependencies are always rejected.
///
/// # Errors
///
/// `EmptyPlan`, `UnknownDependency` or `DependencyViolation`.
pub fn validate_steps(steps: &[Step], preloaded: &BTreeSet<usize>) -> ScriptoriumResult<()> {
    if steps.is_empty() {
        return Err(PipelineError::new(PipelineErrorKind::EmptyPlan).into());
    }

    for (index, step) in steps.iter().enumerate() {
        for &dependency in &step.depends_on {
            if dependency >= steps.len() {
                return Err(PipelineError::new(PipelineErrorKind::UnknownDependency {
                    step: index,
                    dependency,
                    total: steps.len(),
                })
                .into());
            }
            let satisfiable =
                dependency < index || (dependency > index && preloaded.contains(&dependency));
            if !satisfiable {
                return Err(PipelineError::new(PipelineErrorKind::DependencyViolation {
                    step: index,
                    dependency,
                })
                .into());
            }
        }
    }
    Ok(())
}
