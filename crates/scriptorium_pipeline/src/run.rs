//! Live run handle and its lifecycle state machine.
//!
//! `idle → running → {paused, completed, cancelled, error}`, with
//! `paused → running` on resume and `paused → cancelled` on cancel. The state
//! lives in a `watch` channel so the execution loop can park on a pause and be
//! woken by either a resume or a cancel.

use scriptorium_core::{RunId, RunState, RunTarget, Step, StepOutput};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{RwLock, watch};

/// One pipeline run, shared between the execution loop and external callers.
///
/// External callers only use the control surface (`pause`, `resume`,
/// `cancel`) and the read accessors; every transition goes through the
/// `watch` channel so control calls are serialized against the loop.
#[derive(Debug)]
pub struct PipelineRun {
    id: RunId,
    target: RunTarget,
    steps: Vec<Step>,
    preloaded: BTreeSet<usize>,
    state: watch::Sender<RunState>,
    current_step: AtomicUsize,
    outputs: RwLock<BTreeMap<usize, StepOutput>>,
}

impl PipelineRun {
    /// Creates an idle run. `preloaded` outputs mark steps as already done.
    pub fn new(target: RunTarget, steps: Vec<Step>, preloaded: BTreeMap<usize, StepOutput>) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            id: RunId::new(),
            target,
            steps,
            preloaded: preloaded.keys().copied().collect(),
            state,
            current_step: AtomicUsize::new(0),
            outputs: RwLock::new(preloaded),
        }
    }

    /// Run identifier.
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Project/chapter the run writes to.
    pub fn target(&self) -> &RunTarget {
        &self.target
    }

    /// The immutable step list.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether step `index` was supplied as already completed.
    pub fn is_preloaded(&self, index: usize) -> bool {
        self.preloaded.contains(&index)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// `(current step index, total step count)`; the index never decreases.
    pub fn progress(&self) -> (usize, usize) {
        (self.current_step.load(Ordering::Acquire), self.steps.len())
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Parks the run before its next step. No-op unless running.
    pub fn pause(&self) -> bool {
        let changed = self.transition(|s| s == RunState::Running, RunState::Paused);
        if changed {
            tracing::info!(run_id = %self.id, "Pause requested");
        }
        changed
    }

    /// Unparks a paused run. No-op unless paused.
    pub fn resume(&self) -> bool {
        let changed = self.transition(|s| s == RunState::Paused, RunState::Running);
        if changed {
            tracing::info!(run_id = %self.id, "Run resumed");
        }
        changed
    }

    /// Stops the run before its next step, waking a paused loop.
    ///
    /// No-op unless running or paused. An agent call already in flight
    /// finishes first.
    pub fn cancel(&self) -> bool {
        let changed = self.transition(|s| s.is_live(), RunState::Cancelled);
        if changed {
            tracing::info!(run_id = %self.id, "Cancel requested");
        }
        changed
    }

    /// Copy of every output recorded so far, preloaded ones included.
    pub async fn outputs(&self) -> BTreeMap<usize, StepOutput> {
        self.outputs.read().await.clone()
    }

    /// Output of one step, if it has completed.
    pub async fn output(&self, index: usize) -> Option<StepOutput> {
        self.outputs.read().await.get(&index).cloned()
    }

    pub(crate) fn begin(&self) -> bool {
        self.transition(|s| s == RunState::Idle, RunState::Running)
    }

    /// Waits out a pause and returns the state that ended it.
    pub(crate) async fn checkpoint(&self) -> RunState {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(|s| *s != RunState::Paused).await {
            Ok(state) => *state,
            // Unreachable while `self` holds the sender.
            Err(_) => RunState::Cancelled,
        }
    }

    pub(crate) fn escalate(&self) -> bool {
        self.transition(|s| s == RunState::Running, RunState::Paused)
    }

    pub(crate) fn complete(&self) -> bool {
        self.transition(|s| s == RunState::Running, RunState::Completed)
    }

    pub(crate) fn fail(&self) -> bool {
        self.transition(|s| !s.is_terminal(), RunState::Error)
    }

    pub(crate) fn set_current_step(&self, index: usize) {
        self.current_step.fetch_max(index, Ordering::AcqRel);
    }

    pub(crate) async fn store_output(&self, index: usize, output: StepOutput) {
        self.outputs.write().await.insert(index, output);
    }

    fn transition(&self, allowed: impl Fn(RunState) -> bool, next: RunState) -> bool {
        self.state.send_if_modified(|state| {
            if allowed(*state) {
                tracing::debug!(run_id = %self.id, from = %state, to = %next, "Run state transition");
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::{AgentRole, TokenUsage};
    use std::sync::Arc;
    use std::time::Duration;

    fn run(steps: usize) -> PipelineRun {
        let steps = (0..steps)
            .map(|i| Step::new(AgentRole::Writer, format!("task {i}"), ""))
            .collect();
        PipelineRun::new(RunTarget::new("p1", None), steps, BTreeMap::new())
    }

    #[test]
    fn control_calls_are_no_ops_outside_their_states() {
        let run = run(2);
        assert!(!run.pause());
        assert!(!run.resume());
        assert!(!run.cancel());
        assert_eq!(run.state(), RunState::Idle);

        assert!(run.begin());
        assert!(!run.begin());
        assert!(!run.resume());
        assert!(run.pause());
        assert!(!run.pause());
        assert!(run.resume());
        assert_eq!(run.state(), RunState::Running);
    }

    #[test]
    fn terminal_states_are_final() {
        let run = run(1);
        run.begin();
        assert!(run.cancel());
        assert!(!run.resume());
        assert!(!run.pause());
        assert!(!run.complete());
        assert!(!run.fail());
        assert_eq!(run.state(), RunState::Cancelled);
    }

    #[test]
    fn progress_is_monotonic() {
        let run = run(4);
        run.set_current_step(2);
        run.set_current_step(1);
        assert_eq!(run.progress(), (2, 4));
    }

    #[tokio::test]
    async fn cancel_wakes_a_paused_checkpoint() {
        let run = Arc::new(run(2));
        run.begin();
        run.pause();

        let waiter = tokio::spawn({
            let run = run.clone();
            async move { run.checkpoint().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        run.cancel();
        let state = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("checkpoint should wake")
            .unwrap();
        assert_eq!(state, RunState::Cancelled);
    }

    #[tokio::test]
    async fn resume_wakes_a_paused_checkpoint() {
        let run = Arc::new(run(2));
        run.begin();
        run.pause();

        let waiter = tokio::spawn({
            let run = run.clone();
            async move { run.checkpoint().await }
        });
        run.resume();
        let state = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("checkpoint should wake")
            .unwrap();
        assert_eq!(state, RunState::Running);
    }

    #[tokio::test]
    async fn preloaded_outputs_are_visible() {
        let mut preloaded = BTreeMap::new();
        preloaded.insert(0, StepOutput::new(AgentRole::Planner, "plan", TokenUsage::default()));
        let run = PipelineRun::new(
            RunTarget::new("p1", None),
            vec![Step::new(AgentRole::Planner, "plan", ""), Step::new(AgentRole::Writer, "write", "")],
            preloaded,
        );
        assert!(run.is_preloaded(0));
        assert!(!run.is_preloaded(1));
        assert_eq!(run.output(0).await.unwrap().text, "plan");
        assert!(run.output(1).await.is_none());
    }
}
