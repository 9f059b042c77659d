//! Lookup of live pipeline runs.

use async_trait::async_trait;
use scriptorium_core::{RunId, RunTarget};
use std::sync::Arc;

/// Keyed lookup of live runs so external callers can address a run by id.
///
/// Generic over the run handle so the registry does not depend on the
/// orchestrator that owns it. Entries live from run start until the run
/// reaches a terminal state.
#[async_trait]
pub trait RunRegistry<H>: Send + Sync
where
    H: Send + Sync + 'static,
{
    /// Registers a run.
    ///
    /// Returns `false` without inserting if a live run already targets the
    /// same project/chapter pair.
    async fn add(&self, id: RunId, target: RunTarget, handle: Arc<H>) -> bool;

    /// Looks up a live run by id.
    async fn get(&self, id: &RunId) -> Option<Arc<H>>;

    /// Removes a run, returning its handle if it was registered.
    async fn remove(&self, id: &RunId) -> Option<Arc<H>>;

    /// Finds the live run targeting a project/chapter pair, if any.
    async fn find_by_target(&self, target: &RunTarget) -> Option<(RunId, Arc<H>)>;

    /// Ids of every live run.
    async fn list(&self) -> Vec<RunId>;
}
