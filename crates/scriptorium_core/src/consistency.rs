//! Structured result of a continuity check.

use crate::ForeshadowingUpdate;
use serde::{Deserialize, Serialize};

/// Overall confidence that a draft is consistent with the established story.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ConsistencyRating {
    /// No material problems
    High,
    /// Some problems
    #[default]
    Medium,
    /// Serious problems
    Low,
}

/// How serious an issue is.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IssueSeverity {
    /// Informational note
    #[default]
    Info,
    /// Should be looked at
    Warning,
    /// Contradicts established facts
    Error,
}

/// A single problem found by the continuity checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    /// Severity
    pub severity: IssueSeverity,
    /// Category (character, timeline, world, ...)
    pub category: String,
    /// What is wrong
    pub description: String,
    /// Where in the draft
    #[serde(default)]
    pub location: Option<String>,
    /// How to fix it
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// A character the agent found in the text that the project does not know yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCharacter {
    /// Name
    pub name: String,
    /// Narrative role
    #[serde(default)]
    pub role: Option<String>,
    /// Description
    #[serde(default)]
    pub description: String,
}

/// A world entry the agent found in the text that the project does not know yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorldEntry {
    /// Category
    pub category: String,
    /// Title
    pub title: String,
    /// Content
    #[serde(default)]
    pub content: String,
}

/// Newly mentioned entities extracted from one agent output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    /// New characters
    pub characters: Vec<NewCharacter>,
    /// New world entries
    pub world_entries: Vec<NewWorldEntry>,
}

impl ExtractedEntities {
    /// Whether nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.world_entries.is_empty()
    }
}

/// Everything a continuity check produced, derived purely from raw output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyResult {
    /// Overall rating
    pub rating: ConsistencyRating,
    /// Issues found
    pub issues: Vec<ConsistencyIssue>,
    /// Proposed foreshadowing status changes
    pub foreshadowing_updates: Vec<ForeshadowingUpdate>,
    /// Newly detected characters
    pub new_characters: Vec<NewCharacter>,
    /// Newly detected world entries
    pub new_world_entries: Vec<NewWorldEntry>,
}

impl ConsistencyResult {
    /// Entities proposed by this result.
    pub fn entities(&self) -> ExtractedEntities {
        ExtractedEntities {
            characters: self.new_characters.clone(),
            world_entries: self.new_world_entries.clone(),
        }
    }

    /// Number of issues at or above a severity.
    pub fn count_at_least(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity >= severity).count()
    }
}
