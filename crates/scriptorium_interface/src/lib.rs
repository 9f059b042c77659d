//! Trait definitions for the Scriptorium fiction pipeline.
//!
//! This crate defines the seams the pipeline depends on but does not
//! implement: the text-completion service, the narrative store, and the
//! live-run registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod registry;
mod store;
mod traits;
mod types;

pub use registry::RunRegistry;
pub use store::NarrativeStore;
pub use traits::{ChunkStream, CompletionDriver};
pub use types::{FinishReason, StreamChunk, StreamChunkBuilder};
