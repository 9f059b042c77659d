//! In-memory implementation of [`NarrativeStore`] for tests and the CLI.
//!
//! Projects are held as whole [`ProjectSnapshot`]s. All data is lost when the
//! store is dropped.

use async_trait::async_trait;
use chrono::Utc;
use scriptorium_core::{
    Character, ForeshadowingItem, ProjectSnapshot, RunTarget, StepCompletionRecord, StepOutput,
    WorldEntry,
};
use scriptorium_error::{ScriptoriumResult, StoreError, StoreErrorKind};
use scriptorium_interface::NarrativeStore;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// HashMap-backed narrative store.
///
/// # Example
/// ```no_run
/// use scriptorium_core::ProjectSnapshot;
/// use scriptorium_pipeline::InMemoryNarrativeStore;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryNarrativeStore::new();
///     store.insert_project(ProjectSnapshot::default()).await;
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryNarrativeStore {
    /// Projects keyed by id
    projects: Arc<RwLock<HashMap<String, ProjectSnapshot>>>,
    /// Step completions keyed by target, then step index
    completions: Arc<RwLock<HashMap<RunTarget, BTreeMap<usize, StepCompletionRecord>>>>,
}

impl InMemoryNarrativeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a project.
    pub async fn insert_project(&self, snapshot: ProjectSnapshot) {
        self.projects
            .write()
            .await
            .insert(snapshot.project_id.clone(), snapshot);
    }

    /// Current state of a project (for testing).
    pub async fn snapshot(&self, project_id: &str) -> Option<ProjectSnapshot> {
        self.projects.read().await.get(project_id).cloned()
    }

    async fn with_project<T>(
        &self,
        project_id: &str,
        f: impl FnOnce(&mut ProjectSnapshot) -> ScriptoriumResult<T>,
    ) -> ScriptoriumResult<T> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| StoreError::new(StoreErrorKind::ProjectNotFound(project_id.to_string())))?;
        f(project)
    }
}

#[async_trait]
impl NarrativeStore for InMemoryNarrativeStore {
    async fn project_snapshot(&self, project_id: &str) -> ScriptoriumResult<ProjectSnapshot> {
        self.with_project(project_id, |p| Ok(p.clone())).await
    }

    async fn list_foreshadowing(
        &self,
        project_id: &str,
    ) -> ScriptoriumResult<Vec<ForeshadowingItem>> {
        self.with_project(project_id, |p| Ok(p.foreshadowing.clone()))
            .await
    }

    async fn update_foreshadowing(
        &self,
        project_id: &str,
        item: &ForeshadowingItem,
    ) -> ScriptoriumResult<()> {
        self.with_project(project_id, |p| {
            let existing = p
                .foreshadowing
                .iter_mut()
                .find(|f| f.id == item.id)
                .ok_or_else(|| {
                    StoreError::new(StoreErrorKind::ForeshadowingNotFound(item.id.clone()))
                })?;
            *existing = item.clone();
            Ok(())
        })
        .await
    }

    async fn list_characters(&self, project_id: &str) -> ScriptoriumResult<Vec<Character>> {
        self.with_project(project_id, |p| Ok(p.characters.clone()))
            .await
    }

    async fn insert_character(
        &self,
        project_id: &str,
        character: &Character,
    ) -> ScriptoriumResult<()> {
        self.with_project(project_id, |p| {
            p.characters.push(character.clone());
            Ok(())
        })
        .await
    }

    async fn list_world_entries(&self, project_id: &str) -> ScriptoriumResult<Vec<WorldEntry>> {
        self.with_project(project_id, |p| Ok(p.world_entries.clone()))
            .await
    }

    async fn insert_world_entry(
        &self,
        project_id: &str,
        entry: &WorldEntry,
    ) -> ScriptoriumResult<()> {
        self.with_project(project_id, |p| {
            p.world_entries.push(entry.clone());
            Ok(())
        })
        .await
    }

    async fn save_chapter_content(
        &self,
        project_id: &str,
        chapter_id: &str,
        content: &str,
    ) -> ScriptoriumResult<()> {
        self.with_project(project_id, |p| {
            let chapter = p
                .chapters
                .iter_mut()
                .find(|c| c.id == chapter_id)
                .ok_or_else(|| {
                    StoreError::new(StoreErrorKind::ChapterNotFound(chapter_id.to_string()))
                })?;
            chapter.content = Some(content.to_string());
            Ok(())
        })
        .await
    }

    async fn record_step_completion(
        &self,
        target: &RunTarget,
        step_index: usize,
        output: &StepOutput,
    ) -> ScriptoriumResult<()> {
        let record = StepCompletionRecord {
            step_index,
            output: output.clone(),
            completed_at: Utc::now(),
        };
        self.completions
            .write()
            .await
            .entry(target.clone())
            .or_default()
            .insert(step_index, record);
        Ok(())
    }

    async fn completed_steps(
        &self,
        target: &RunTarget,
    ) -> ScriptoriumResult<Vec<StepCompletionRecord>> {
        Ok(self
            .completions
            .read()
            .await
            .get(target)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }
}
