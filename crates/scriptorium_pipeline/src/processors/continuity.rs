//! Continuity-check processing.

use crate::{
    ApplyReport, EntityExtractor, ForeshadowingUpdater, StepContext, StepProcessor,
    parse_consistency,
};
use async_trait::async_trait;
use scriptorium_core::{AgentRole, IssueSeverity};
use scriptorium_error::{PipelineError, PipelineErrorKind, ScriptoriumResult};
use scriptorium_interface::NarrativeStore;
use std::sync::Arc;

/// Parses a continuity report and applies its proposals.
pub struct ContinuityProcessor {
    foreshadowing: ForeshadowingUpdater,
    entities: EntityExtractor,
}

impl ContinuityProcessor {
    /// Create a processor writing to `store`.
    pub fn new(store: Arc<dyn NarrativeStore>) -> Self {
        Self {
            foreshadowing: ForeshadowingUpdater::new(store.clone()),
            entities: EntityExtractor::new(store),
        }
    }
}

#[async_trait]
impl StepProcessor for ContinuityProcessor {
    #[tracing::instrument(skip(self, context), fields(step = context.step_index))]
    async fn process(&self, context: &StepContext<'_>) -> ScriptoriumResult<()> {
        let outcome = parse_consistency(&context.output.text);
        let result = &outcome.value;
        tracing::info!(
            source = %outcome.source,
            rating = ?result.rating,
            issues = result.issues.len(),
            errors = result.count_at_least(IssueSeverity::Error),
            "Parsed continuity report"
        );

        // Both appliers always run.
        let project_id = &context.target.project_id;
        let foreshadowing = self
            .foreshadowing
            .apply(project_id, &result.foreshadowing_updates, context.chapter_number)
            .await;
        let entities = self.entities.apply(project_id, &result.entities()).await;

        let mut report = ApplyReport::default();
        let mut failures = Vec::new();
        for (applier, outcome) in [("foreshadowing", foreshadowing), ("entities", entities)] {
            match outcome {
                Ok(partial) => report.merge(partial),
                Err(e) => {
                    tracing::warn!(applier, error = %e, "Continuity applier failed");
                    failures.push(format!("{}: {}", applier, e));
                }
            }
        }

        for error in &report.errors {
            tracing::warn!(error = %error, "Continuity proposal rejected");
        }
        tracing::info!(
            applied = report.applied,
            skipped = report.skipped,
            rejected = report.errors.len(),
            failed_appliers = failures.len(),
            "Applied continuity proposals"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::new(PipelineErrorKind::ProcessorFailed(failures.join("; "))).into())
        }
    }

    fn should_process(&self, context: &StepContext<'_>) -> bool {
        context.step.role == AgentRole::ContinuityChecker
    }

    fn name(&self) -> &str {
        "ContinuityProcessor"
    }
}
