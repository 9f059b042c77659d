//! Events emitted while a pipeline run executes.

use scriptorium_core::{AgentRole, RunId, Step, StepOutput, TokenUsage};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Sending half of a run's event stream.
pub type EventSink = mpsc::UnboundedSender<PipelineEvent>;

/// One observable event of a run.
///
/// Exactly one of [`PipelineEvent::Error`] and [`PipelineEvent::Completed`]
/// ends a run's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, strum::AsRefStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineEvent {
    /// Echo of the step list, sent once at start
    Plan {
        /// Run being executed
        run_id: RunId,
        /// Full step list
        steps: Vec<Step>,
    },
    /// A step is about to call its agent
    StepStart {
        /// Step index
        step: usize,
        /// Agent role of the step
        role: AgentRole,
    },
    /// Incremental text from the running step
    StepStreamChunk {
        /// Step index
        step: usize,
        /// Agent role of the step
        role: AgentRole,
        /// Chunk text
        text: String,
    },
    /// A step finished
    StepComplete {
        /// Step index
        step: usize,
        /// Agent role of the step
        role: AgentRole,
        /// Full step text
        output: String,
        /// Token usage of the call
        #[serde(rename = "tokenUsage")]
        token_usage: TokenUsage,
    },
    /// A step flagged a high-impact change; the run is parked
    EscalationRequired {
        /// Step index
        step: usize,
        /// Agent role of the step
        role: AgentRole,
        /// Unparsed step output
        #[serde(rename = "rawText")]
        raw_text: String,
    },
    /// The run is parked before `step`
    Paused {
        /// Index of the next step to run
        step: usize,
    },
    /// The run ended without completing
    Error {
        /// Human-readable reason
        message: String,
    },
    /// Every step finished
    Completed {
        /// Run that finished
        run_id: RunId,
    },
}

impl PipelineEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &str {
        self.as_ref()
    }

    /// Whether this event ends the run's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Error { .. } | PipelineEvent::Completed { .. })
    }

    pub(crate) fn step_complete(step: usize, output: &StepOutput) -> Self {
        PipelineEvent::StepComplete {
            step,
            role: output.role,
            output: output.text.clone(),
            token_usage: output.usage,
        }
    }
}
