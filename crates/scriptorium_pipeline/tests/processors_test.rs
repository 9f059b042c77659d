//! Tests for the built-in step processors.

mod test_utils;

use async_trait::async_trait;
use scriptorium_core::{
    AgentRole, Character, ForeshadowingItem, ForeshadowingStatus, ProjectSnapshot, RunId,
    RunTarget, Step, StepCompletionRecord, StepOutput, TokenUsage, WorldEntry,
};
use scriptorium_error::{ScriptoriumResult, StoreError, StoreErrorKind};
use scriptorium_interface::NarrativeStore;
use scriptorium_pipeline::{
    ContinuityProcessor, InMemoryNarrativeStore, StepContext, StepProcessor,
};
use std::sync::Arc;
use test_utils::sample_store;

const REPORT: &str = r#"```json
{"rating": "medium",
 "foreshadowing_updates": [{"title": "The sealed letter", "status": "hinted"}],
 "new_characters": [{"name": "Ivo", "role": "smuggler"}],
 "new_world_entries": [{"category": "location", "title": "Bir Tawil", "content": "A well nobody owns."}]}
```"#;

/// Delegates to an in-memory store but cannot list foreshadowing.
struct ForeshadowingOutage {
    inner: Arc<InMemoryNarrativeStore>,
}

#[async_trait]
impl NarrativeStore for ForeshadowingOutage {
    async fn project_snapshot(&self, project_id: &str) -> ScriptoriumResult<ProjectSnapshot> {
        self.inner.project_snapshot(project_id).await
    }

    async fn list_foreshadowing(
        &self,
        _project_id: &str,
    ) -> ScriptoriumResult<Vec<ForeshadowingItem>> {
        Err(StoreError::new(StoreErrorKind::Backend("foreshadowing table locked".into())).into())
    }

    async fn update_foreshadowing(
        &self,
        project_id: &str,
        item: &ForeshadowingItem,
    ) -> ScriptoriumResult<()> {
        self.inner.update_foreshadowing(project_id, item).await
    }

    async fn list_characters(&self, project_id: &str) -> ScriptoriumResult<Vec<Character>> {
        self.inner.list_characters(project_id).await
    }

    async fn insert_character(
        &self,
        project_id: &str,
        character: &Character,
    ) -> ScriptoriumResult<()> {
        self.inner.insert_character(project_id, character).await
    }

    async fn list_world_entries(&self, project_id: &str) -> ScriptoriumResult<Vec<WorldEntry>> {
        self.inner.list_world_entries(project_id).await
    }

    async fn insert_world_entry(
        &self,
        project_id: &str,
        entry: &WorldEntry,
    ) -> ScriptoriumResult<()> {
        self.inner.insert_world_entry(project_id, entry).await
    }

    async fn save_chapter_content(
        &self,
        project_id: &str,
        chapter_id: &str,
        content: &str,
    ) -> ScriptoriumResult<()> {
        self.inner.save_chapter_content(project_id, chapter_id, content).await
    }

    async fn record_step_completion(
        &self,
        target: &RunTarget,
        step_index: usize,
        output: &StepOutput,
    ) -> ScriptoriumResult<()> {
        self.inner.record_step_completion(target, step_index, output).await
    }

    async fn completed_steps(
        &self,
        target: &RunTarget,
    ) -> ScriptoriumResult<Vec<StepCompletionRecord>> {
        self.inner.completed_steps(target).await
    }
}

async fn process_report(processor: &ContinuityProcessor) -> ScriptoriumResult<()> {
    let target = RunTarget::new("salt-road", Some("c2".into()));
    let step = Step::new(AgentRole::ContinuityChecker, "check", "");
    let output = StepOutput::new(AgentRole::ContinuityChecker, REPORT, TokenUsage::default());
    let context = StepContext {
        run_id: RunId::new(),
        target: &target,
        chapter_number: Some(2),
        step_index: 0,
        step: &step,
        output: &output,
    };
    assert!(processor.should_process(&context));
    processor.process(&context).await
}

#[tokio::test]
async fn test_continuity_report_applies_every_proposal() {
    let store = sample_store().await;
    let processor = ContinuityProcessor::new(store.clone());

    process_report(&processor).await.unwrap();

    let snapshot = store.snapshot("salt-road").await.unwrap();
    assert!(snapshot.characters.iter().any(|c| c.name == "Ivo"));
    assert!(snapshot.world_entries.iter().any(|w| w.title == "Bir Tawil"));
    let letter = snapshot
        .foreshadowing
        .iter()
        .find(|f| f.title == "The sealed letter")
        .unwrap();
    assert_eq!(letter.status, ForeshadowingStatus::Hinted);
}

#[tokio::test]
async fn test_entities_apply_when_foreshadowing_store_fails() {
    let inner = sample_store().await;
    let processor = ContinuityProcessor::new(Arc::new(ForeshadowingOutage {
        inner: inner.clone(),
    }));

    let err = process_report(&processor).await.unwrap_err();
    assert!(err.to_string().contains("foreshadowing table locked"));

    let snapshot = inner.snapshot("salt-road").await.unwrap();
    assert!(snapshot.characters.iter().any(|c| c.name == "Ivo"));
    assert!(snapshot.world_entries.iter().any(|w| w.title == "Bir Tawil"));
    let letter = snapshot
        .foreshadowing
        .iter()
        .find(|f| f.title == "The sealed letter")
        .unwrap();
    assert_eq!(letter.status, ForeshadowingStatus::Planted);
}
