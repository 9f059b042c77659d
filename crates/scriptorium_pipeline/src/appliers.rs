//! Persisting parsed facts into the narrative store.

use scriptorium_core::{
    Character, ExtractedEntities, ForeshadowingItem, ForeshadowingStatus, ForeshadowingUpdate,
    WorldEntry,
};
use scriptorium_error::ScriptoriumResult;
use scriptorium_interface::NarrativeStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Outcome of applying one batch of proposals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Proposals that changed the store
    pub applied: usize,
    /// Valid proposals that were no-ops
    pub skipped: usize,
    /// Non-fatal failures, one message per rejected proposal
    pub errors: Vec<String>,
}

impl ApplyReport {
    /// Adds another report's counts and messages to this one.
    pub fn merge(&mut self, other: ApplyReport) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }
}

/// Result of checking one proposal against an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    /// The item moves forward
    Advance(ForeshadowingItem),
    /// The proposal is same-or-earlier
    Unchanged,
}

/// Applies the monotonic status rule to one item.
///
/// Resolving also records the resolving chapter (the proposal's, else
/// `fallback_chapter`) and the note.
///
/// # Examples
///
/// ```
/// use scriptorium_core::{ForeshadowingItem, ForeshadowingStatus, ForeshadowingUpdate};
/// use scriptorium_pipeline::{StatusChange, advance_status};
///
/// let item = ForeshadowingItem {
///     id: "f1".into(),
///     title: "Locked Door".into(),
///     description: String::new(),
///     status: ForeshadowingStatus::Resolved,
///     planted_chapter: Some(1),
///     target_chapter: Some(9),
///     resolved_chapter: Some(9),
///     resolution_note: None,
/// };
/// let update = ForeshadowingUpdate {
///     title: "Locked Door".into(),
///     status: ForeshadowingStatus::Hinted,
///     chapter: None,
///     note: None,
/// };
/// assert_eq!(advance_status(&item, &update, None), StatusChange::Unchanged);
/// ```
pub fn advance_status(
    item: &ForeshadowingItem,
    update: &ForeshadowingUpdate,
    fallback_chapter: Option<u32>,
) -> StatusChange {
    if !item.status.can_advance_to(update.status) {
        return StatusChange::Unchanged;
    }
    let mut next = item.clone();
    next.status = update.status;
    if update.status == ForeshadowingStatus::Resolved {
        next.resolved_chapter = update.chapter.or(fallback_chapter);
        if update.note.is_some() {
            next.resolution_note = update.note.clone();
        }
    }
    StatusChange::Advance(next)
}

/// Applies foreshadowing status proposals.
#[derive(Clone)]
pub struct ForeshadowingUpdater {
    store: Arc<dyn NarrativeStore>,
}

impl ForeshadowingUpdater {
    /// Creates an updater writing to `store`.
    pub fn new(store: Arc<dyn NarrativeStore>) -> Self {
        Self { store }
    }

    /// Matches proposals to items by exact title and applies forward moves.
    ///
    /// Unknown titles and failed writes are collected, not raised. A later
    /// proposal in the same batch sees the effect of an earlier one.
    ///
    /// # Errors
    ///
    /// Fails only if the current items cannot be listed.
    #[instrument(skip(self, updates), fields(project_id = %project_id, proposals = updates.len()))]
    pub async fn apply(
        &self,
        project_id: &str,
        updates: &[ForeshadowingUpdate],
        chapter_number: Option<u32>,
    ) -> ScriptoriumResult<ApplyReport> {
        let mut report = ApplyReport::default();
        if updates.is_empty() {
            return Ok(report);
        }

        let mut items: HashMap<String, ForeshadowingItem> = HashMap::new();
        for item in self.store.list_foreshadowing(project_id).await? {
            items.entry(item.title.clone()).or_insert(item);
        }

        for update in updates {
            let Some(current) = items.get(&update.title) else {
                warn!(title = %update.title, "No foreshadowing item with this title");
                report
                    .errors
                    .push(format!("Unknown foreshadowing item '{}'", update.title));
                continue;
            };

            match advance_status(current, update, chapter_number) {
                StatusChange::Unchanged => {
                    debug!(
                        title = %update.title,
                        current = %current.status,
                        proposed = %update.status,
                        "Ignoring non-forward status"
                    );
                    report.skipped += 1;
                }
                StatusChange::Advance(next) => {
                    match self.store.update_foreshadowing(project_id, &next).await {
                        Ok(()) => {
                            debug!(title = %next.title, status = %next.status, "Advanced foreshadowing");
                            report.applied += 1;
                            items.insert(next.title.clone(), next);
                        }
                        Err(e) => {
                            warn!(title = %update.title, error = %e, "Failed to update foreshadowing");
                            report.errors.push(format!("{}: {}", update.title, e));
                        }
                    }
                }
            }
        }

        Ok(report)
    }
}

/// Inserts newly mentioned characters and world entries without duplicates.
#[derive(Clone)]
pub struct EntityExtractor {
    store: Arc<dyn NarrativeStore>,
}

impl EntityExtractor {
    /// Creates an extractor writing to `store`.
    pub fn new(store: Arc<dyn NarrativeStore>) -> Self {
        Self { store }
    }

    /// Inserts every proposal not already present.
    ///
    /// Characters are keyed by exact name and world entries by
    /// `(category, title)`, against both stored records and earlier
    /// insertions in this batch.
    ///
    /// # Errors
    ///
    /// Fails only if the existing records cannot be listed.
    #[instrument(
        skip(self, entities),
        fields(
            project_id = %project_id,
            characters = entities.characters.len(),
            world_entries = entities.world_entries.len()
        )
    )]
    pub async fn apply(
        &self,
        project_id: &str,
        entities: &ExtractedEntities,
    ) -> ScriptoriumResult<ApplyReport> {
        let mut report = ApplyReport::default();
        if entities.is_empty() {
            return Ok(report);
        }

        if !entities.characters.is_empty() {
            let mut names: HashSet<String> = self
                .store
                .list_characters(project_id)
                .await?
                .into_iter()
                .map(|c| c.name)
                .collect();

            for proposed in &entities.characters {
                let name = proposed.name.trim();
                if name.is_empty() {
                    report.errors.push("Character proposal without a name".to_string());
                    continue;
                }
                if names.contains(name) {
                    report.skipped += 1;
                    continue;
                }
                let character = Character {
                    name: name.to_string(),
                    role: proposed.role.clone(),
                    description: proposed.description.clone(),
                };
                match self.store.insert_character(project_id, &character).await {
                    Ok(()) => {
                        debug!(name = %character.name, "Inserted character");
                        names.insert(character.name);
                        report.applied += 1;
                    }
                    Err(e) => {
                        warn!(name = %name, error = %e, "Failed to insert character");
                        report.errors.push(format!("{}: {}", name, e));
                    }
                }
            }
        }

        if !entities.world_entries.is_empty() {
            let mut keys: HashSet<(String, String)> = self
                .store
                .list_world_entries(project_id)
                .await?
                .into_iter()
                .map(|w| (w.category, w.title))
                .collect();

            for proposed in &entities.world_entries {
                let category = proposed.category.trim();
                let title = proposed.title.trim();
                if title.is_empty() || category.is_empty() {
                    report
                        .errors
                        .push("World entry proposal without a category or title".to_string());
                    continue;
                }
                let key = (category.to_string(), title.to_string());
                if keys.contains(&key) {
                    report.skipped += 1;
                    continue;
                }
                let entry = WorldEntry {
                    category: key.0.clone(),
                    title: key.1.clone(),
                    content: proposed.content.clone(),
                };
                match self.store.insert_world_entry(project_id, &entry).await {
                    Ok(()) => {
                        debug!(category = %entry.category, title = %entry.title, "Inserted world entry");
                        keys.insert(key);
                        report.applied += 1;
                    }
                    Err(e) => {
                        warn!(title = %title, error = %e, "Failed to insert world entry");
                        report.errors.push(format!("{}: {}", title, e));
                    }
                }
            }
        }

        Ok(report)
    }
}
