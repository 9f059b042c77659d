//! Core data types for the Scriptorium fiction pipeline.
//!
//! This crate provides the plain data shared by every other crate: chat
//! messages and completion requests, the agent roles, the narrative entities
//! a project is made of, pipeline steps and their outputs, and the structured
//! result of a continuity check.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod agent_role;
mod consistency;
mod foreshadowing;
mod message;
mod narrative;
mod request;
mod role;
mod run;
mod step;
mod usage;

pub use agent_role::AgentRole;
pub use consistency::{
    ConsistencyIssue, ConsistencyRating, ConsistencyResult, ExtractedEntities, IssueSeverity,
    NewCharacter, NewWorldEntry,
};
pub use foreshadowing::{ForeshadowingItem, ForeshadowingStatus, ForeshadowingUpdate};
pub use message::Message;
pub use narrative::{
    Character, ChapterRecord, GlossaryTerm, PlotPoint, ProjectSnapshot, StyleReference,
    WorldEntry,
};
pub use request::{GenerateRequest, GenerateRequestBuilder, GenerateResponse};
pub use role::Role;
pub use run::{RunId, RunState, RunTarget};
pub use step::{Step, StepCompletionRecord, StepOutput};
pub use usage::TokenUsage;
