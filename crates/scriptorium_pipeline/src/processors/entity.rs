//! Entity extraction from character and world-building passes.

use crate::{EntityExtractor, StepContext, StepProcessor, parse_new_entities};
use async_trait::async_trait;
use scriptorium_core::AgentRole;
use scriptorium_error::ScriptoriumResult;
use scriptorium_interface::NarrativeStore;
use std::sync::Arc;

/// Inserts entities proposed by character manager and world builder steps.
pub struct EntityProcessor {
    extractor: EntityExtractor,
}

impl EntityProcessor {
    /// Create a processor writing to `store`.
    pub fn new(store: Arc<dyn NarrativeStore>) -> Self {
        Self {
            extractor: EntityExtractor::new(store),
        }
    }
}

#[async_trait]
impl StepProcessor for EntityProcessor {
    #[tracing::instrument(skip(self, context), fields(step = context.step_index))]
    async fn process(&self, context: &StepContext<'_>) -> ScriptoriumResult<()> {
        let entities = parse_new_entities(&context.output.text).into_inner();
        if entities.is_empty() {
            tracing::debug!("No entity proposals");
            return Ok(());
        }

        let report = self
            .extractor
            .apply(&context.target.project_id, &entities)
            .await?;
        for error in &report.errors {
            tracing::warn!(error = %error, "Entity proposal rejected");
        }
        tracing::info!(
            applied = report.applied,
            skipped = report.skipped,
            "Applied entity proposals"
        );
        Ok(())
    }

    fn should_process(&self, context: &StepContext<'_>) -> bool {
        matches!(
            context.step.role,
            AgentRole::CharacterManager | AgentRole::WorldBuilder
        )
    }

    fn name(&self) -> &str {
        "EntityProcessor"
    }
}
