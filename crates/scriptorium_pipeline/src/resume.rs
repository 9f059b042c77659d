//! Restart planning for runs whose step completions were persisted.

use scriptorium_core::{StepCompletionRecord, StepOutput};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Where to restart a step list given the steps already completed.
///
/// The restart point is the first incomplete step. Completions at or beyond
/// it are discarded and re-executed, since their dependencies may have been
/// produced by a run that no longer matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePlan {
    /// Index of the first step to execute
    pub start_index: usize,
    /// Completed steps reused as preloaded outputs
    pub kept: Vec<usize>,
    /// Completed steps that will run again
    pub discarded: Vec<usize>,
}

impl ResumePlan {
    /// Plans a restart of `step_count` steps. Out-of-range indices are ignored.
    pub fn compute(step_count: usize, completed: impl IntoIterator<Item = usize>) -> Self {
        let completed: BTreeSet<usize> = completed.into_iter().filter(|&i| i < step_count).collect();
        let start_index = (0..step_count)
            .find(|i| !completed.contains(i))
            .unwrap_or(step_count);
        let (kept, discarded): (Vec<usize>, Vec<usize>) = completed.into_iter().partition(|&i| i < start_index);
        Self {
            start_index,
            kept,
            discarded,
        }
    }

    /// Plans a restart from persisted completion records.
    pub fn from_records(step_count: usize, records: &[StepCompletionRecord]) -> Self {
        Self::compute(step_count, records.iter().map(|r| r.step_index))
    }

    /// Whether every step already completed.
    pub fn is_complete(&self, step_count: usize) -> bool {
        self.start_index >= step_count
    }

    /// Restricts `outputs` to the steps this plan keeps.
    pub fn retain(&self, outputs: &BTreeMap<usize, StepOutput>) -> BTreeMap<usize, StepOutput> {
        self.kept
            .iter()
            .filter_map(|i| outputs.get(i).map(|o| (*i, o.clone())))
            .collect()
    }

    /// Kept outputs taken from persisted records.
    pub fn preloaded(&self, records: &[StepCompletionRecord]) -> BTreeMap<usize, StepOutput> {
        let outputs = records
            .iter()
            .map(|r| (r.step_index, r.output.clone()))
            .collect();
        self.retain(&outputs)
    }
}

/// Execution status of a project/chapter target.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TargetStatus {
    /// No step completed and nothing running
    NotStarted,
    /// A run is live for the target
    InProgress,
    /// Some steps completed and nothing running
    PartiallyComplete,
    /// Every step completed
    Completed,
}

impl TargetStatus {
    /// Classifies a target. A live run always wins so callers never start a
    /// second execution against it.
    pub fn classify(
        step_count: usize,
        completed: impl IntoIterator<Item = usize>,
        in_flight: bool,
    ) -> Self {
        if in_flight {
            return TargetStatus::InProgress;
        }
        let done: BTreeSet<usize> = completed.into_iter().filter(|&i| i < step_count).collect();
        match done.len() {
            0 => TargetStatus::NotStarted,
            n if n == step_count => TargetStatus::Completed,
            _ => TargetStatus::PartiallyComplete,
        }
    }

    /// Whether a new run may be launched against the target.
    pub fn can_launch(&self) -> bool {
        !matches!(self, TargetStatus::InProgress)
    }
}
