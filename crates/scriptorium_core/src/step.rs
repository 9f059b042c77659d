//! Pipeline steps and their outputs.

use crate::{AgentRole, Message, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of pipeline work, defined by the caller before execution.
///
/// # Examples
///
/// ```
/// use scriptorium_core::{AgentRole, Message, Step};
///
/// let step = Step::new(AgentRole::Writer, "draft", "Draft chapter 3")
///     .with_message(Message::user("Write the chapter."))
///     .depends_on([0, 1]);
/// assert_eq!(step.depends_on, vec![0, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Agent that executes the step
    pub role: AgentRole,
    /// Short task label
    pub task: String,
    /// Human description
    #[serde(default)]
    pub description: String,
    /// Prompt messages for the step
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Indices of steps whose output this step consumes, in declared order
    #[serde(default)]
    pub depends_on: Vec<usize>,
}

impl Step {
    /// Creates a step without messages or dependencies.
    pub fn new(role: AgentRole, task: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            role,
            task: task.into(),
            description: description.into(),
            messages: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Appends a prompt message.
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Sets the dependency list, preserving the given order.
    pub fn depends_on(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.depends_on = indices.into_iter().collect();
        self
    }
}

/// Result of executing one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutput {
    /// Agent that produced the output
    pub role: AgentRole,
    /// Raw text returned by the agent
    pub text: String,
    /// Token usage of the call
    pub usage: TokenUsage,
}

impl StepOutput {
    /// Creates an output record.
    pub fn new(role: AgentRole, text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            role,
            text: text.into(),
            usage,
        }
    }
}

/// Persisted marker that a step of a target completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCompletionRecord {
    /// Step index
    pub step_index: usize,
    /// The step's output
    pub output: StepOutput,
    /// When the step finished
    pub completed_at: DateTime<Utc>,
}
