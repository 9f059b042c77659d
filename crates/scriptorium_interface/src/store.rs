//! Persistence collaborator used by the pipeline.

use async_trait::async_trait;
use scriptorium_core::{
    Character, ForeshadowingItem, ProjectSnapshot, RunTarget, StepCompletionRecord, StepOutput,
    WorldEntry,
};
use scriptorium_error::ScriptoriumResult;

/// Read and write access to a project's narrative state.
///
/// The surrounding application owns the schema; the pipeline only needs
/// these operations. Reads through [`NarrativeStore::project_snapshot`] are
/// taken once per run and may go stale while the run executes.
#[async_trait]
pub trait NarrativeStore: Send + Sync {
    /// Fetch everything the context aggregator renders.
    async fn project_snapshot(&self, project_id: &str) -> ScriptoriumResult<ProjectSnapshot>;

    /// Current foreshadowing items of a project.
    async fn list_foreshadowing(&self, project_id: &str)
    -> ScriptoriumResult<Vec<ForeshadowingItem>>;

    /// Persist a changed foreshadowing item, matched by its id.
    async fn update_foreshadowing(
        &self,
        project_id: &str,
        item: &ForeshadowingItem,
    ) -> ScriptoriumResult<()>;

    /// Current characters of a project.
    async fn list_characters(&self, project_id: &str) -> ScriptoriumResult<Vec<Character>>;

    /// Insert a new character.
    async fn insert_character(&self, project_id: &str, character: &Character)
    -> ScriptoriumResult<()>;

    /// Current world entries of a project.
    async fn list_world_entries(&self, project_id: &str) -> ScriptoriumResult<Vec<WorldEntry>>;

    /// Insert a new world entry.
    async fn insert_world_entry(&self, project_id: &str, entry: &WorldEntry)
    -> ScriptoriumResult<()>;

    /// Replace a chapter's drafted content.
    async fn save_chapter_content(
        &self,
        project_id: &str,
        chapter_id: &str,
        content: &str,
    ) -> ScriptoriumResult<()>;

    /// Record that a step of a target finished.
    async fn record_step_completion(
        &self,
        target: &RunTarget,
        step_index: usize,
        output: &StepOutput,
    ) -> ScriptoriumResult<()>;

    /// All step completions recorded for a target, ordered by step index.
    async fn completed_steps(&self, target: &RunTarget)
    -> ScriptoriumResult<Vec<StepCompletionRecord>>;
}
