//! Chapter draft persistence.

use crate::{StepContext, StepProcessor};
use async_trait::async_trait;
use scriptorium_error::ScriptoriumResult;
use scriptorium_interface::NarrativeStore;
use std::sync::Arc;

/// Saves writer and fixer output as the target chapter's content.
///
/// Later drafts in the same run overwrite earlier ones.
pub struct ChapterDraftProcessor {
    store: Arc<dyn NarrativeStore>,
}

impl ChapterDraftProcessor {
    /// Create a processor writing to `store`.
    pub fn new(store: Arc<dyn NarrativeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StepProcessor for ChapterDraftProcessor {
    #[tracing::instrument(skip(self, context), fields(step = context.step_index))]
    async fn process(&self, context: &StepContext<'_>) -> ScriptoriumResult<()> {
        let Some(chapter_id) = context.target.chapter_id.as_deref() else {
            return Ok(());
        };
        self.store
            .save_chapter_content(&context.target.project_id, chapter_id, &context.output.text)
            .await?;
        tracing::info!(
            chapter_id = %chapter_id,
            chars = context.output.text.len(),
            "Saved chapter draft"
        );
        Ok(())
    }

    fn should_process(&self, context: &StepContext<'_>) -> bool {
        context.step.role.produces_prose()
            && context.target.chapter_id.is_some()
            && !context.output.text.trim().is_empty()
    }

    fn name(&self) -> &str {
        "ChapterDraftProcessor"
    }
}
