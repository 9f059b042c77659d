//! In-memory registry of live pipeline runs.

use async_trait::async_trait;
use scriptorium_core::{RunId, RunTarget};
use scriptorium_interface::RunRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local [`RunRegistry`] backed by a `HashMap`.
///
/// Registration checks the target and inserts under one write lock, so two
/// concurrent `add` calls for the same target cannot both succeed.
#[derive(Debug)]
pub struct InMemoryRunRegistry<H> {
    runs: Arc<RwLock<HashMap<RunId, (RunTarget, Arc<H>)>>>,
}

impl<H> InMemoryRunRegistry<H> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of live runs.
    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Whether no run is live.
    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

impl<H> Default for InMemoryRunRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Clone for InMemoryRunRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            runs: self.runs.clone(),
        }
    }
}

#[async_trait]
impl<H> RunRegistry<H> for InMemoryRunRegistry<H>
where
    H: Send + Sync + 'static,
{
    async fn add(&self, id: RunId, target: RunTarget, handle: Arc<H>) -> bool {
        let mut runs = self.runs.write().await;
        if runs.values().any(|(existing, _)| *existing == target) {
            tracing::debug!(run_id = %id, target = %target, "Target already has a live run");
            return false;
        }
        runs.insert(id, (target, handle));
        true
    }

    async fn get(&self, id: &RunId) -> Option<Arc<H>> {
        self.runs.read().await.get(id).map(|(_, handle)| handle.clone())
    }

    async fn remove(&self, id: &RunId) -> Option<Arc<H>> {
        self.runs.write().await.remove(id).map(|(_, handle)| handle)
    }

    async fn find_by_target(&self, target: &RunTarget) -> Option<(RunId, Arc<H>)> {
        self.runs
            .read()
            .await
            .iter()
            .find(|(_, (existing, _))| existing == target)
            .map(|(id, (_, handle))| (*id, handle.clone()))
    }

    async fn list(&self) -> Vec<RunId> {
        self.runs.read().await.keys().copied().collect()
    }
}
