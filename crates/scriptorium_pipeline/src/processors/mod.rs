//! Built-in step processors.
//!
//! - Continuity checks: consistency parsing, then foreshadowing and entity updates
//! - Plot and editing passes: foreshadowing updates
//! - Character and world passes: entity extraction
//! - Chapter drafts: chapter content

mod chapter;
mod continuity;
mod entity;
mod foreshadowing;

pub use chapter::ChapterDraftProcessor;
pub use continuity::ContinuityProcessor;
pub use entity::EntityProcessor;
pub use foreshadowing::ForeshadowingProcessor;

use crate::ProcessorRegistry;
use scriptorium_interface::NarrativeStore;
use std::sync::Arc;

impl ProcessorRegistry {
    /// A registry with every built-in processor writing to `store`.
    pub fn with_defaults(store: Arc<dyn NarrativeStore>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ContinuityProcessor::new(store.clone())));
        registry.register(Box::new(ForeshadowingProcessor::new(store.clone())));
        registry.register(Box::new(EntityProcessor::new(store.clone())));
        registry.register(Box::new(ChapterDraftProcessor::new(store)));
        registry
    }
}
