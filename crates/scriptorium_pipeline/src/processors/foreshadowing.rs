//! Foreshadowing updates from plot and editing passes.

use crate::{ForeshadowingUpdater, StepContext, StepProcessor, parse_foreshadowing_updates};
use async_trait::async_trait;
use scriptorium_core::AgentRole;
use scriptorium_error::ScriptoriumResult;
use scriptorium_interface::NarrativeStore;
use std::sync::Arc;

/// Applies foreshadowing proposals from plot architect and editor steps.
pub struct ForeshadowingProcessor {
    updater: ForeshadowingUpdater,
}

impl ForeshadowingProcessor {
    /// Create a processor writing to `store`.
    pub fn new(store: Arc<dyn NarrativeStore>) -> Self {
        Self {
            updater: ForeshadowingUpdater::new(store),
        }
    }
}

#[async_trait]
impl StepProcessor for ForeshadowingProcessor {
    #[tracing::instrument(skip(self, context), fields(step = context.step_index))]
    async fn process(&self, context: &StepContext<'_>) -> ScriptoriumResult<()> {
        let updates = parse_foreshadowing_updates(&context.output.text).into_inner();
        if updates.is_empty() {
            tracing::debug!("No foreshadowing proposals");
            return Ok(());
        }

        let report = self
            .updater
            .apply(&context.target.project_id, &updates, context.chapter_number)
            .await?;
        for error in &report.errors {
            tracing::warn!(error = %error, "Foreshadowing proposal rejected");
        }
        tracing::info!(
            applied = report.applied,
            skipped = report.skipped,
            "Applied foreshadowing proposals"
        );
        Ok(())
    }

    fn should_process(&self, context: &StepContext<'_>) -> bool {
        matches!(context.step.role, AgentRole::PlotArchitect | AgentRole::Editor)
    }

    fn name(&self) -> &str {
        "ForeshadowingProcessor"
    }
}
