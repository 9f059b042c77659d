//! Foreshadowing items and their monotonic status.

use serde::{Deserialize, Serialize};

/// Progress of a planted narrative thread.
///
/// The declaration order is the only allowed direction of travel:
/// a status may move forward, never back.
///
/// # Examples
///
/// ```
/// use scriptorium_core::ForeshadowingStatus;
///
/// assert!(ForeshadowingStatus::Planted.can_advance_to(ForeshadowingStatus::Resolved));
/// assert!(!ForeshadowingStatus::Resolved.can_advance_to(ForeshadowingStatus::Hinted));
/// assert!(!ForeshadowingStatus::Hinted.can_advance_to(ForeshadowingStatus::Hinted));
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ForeshadowingStatus {
    /// Introduced but not yet referenced again
    Planted,
    /// Referenced again without payoff
    Hinted,
    /// Partly paid off
    PartiallyResolved,
    /// Fully paid off
    Resolved,
    /// Dropped on purpose
    Abandoned,
}

impl ForeshadowingStatus {
    /// Whether moving from `self` to `next` is a forward transition.
    pub fn can_advance_to(&self, next: ForeshadowingStatus) -> bool {
        next > *self
    }

    /// Whether the thread still needs attention in prompts.
    pub fn is_open(&self) -> bool {
        !matches!(self, ForeshadowingStatus::Resolved | ForeshadowingStatus::Abandoned)
    }
}

/// A planted narrative thread tracked across chapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeshadowingItem {
    /// Store identifier
    pub id: String,
    /// Natural key used to match agent output back to this record
    pub title: String,
    /// What was planted
    #[serde(default)]
    pub description: String,
    /// Current status
    pub status: ForeshadowingStatus,
    /// Chapter number where it was planted
    #[serde(default)]
    pub planted_chapter: Option<u32>,
    /// Chapter number where the payoff is intended
    #[serde(default)]
    pub target_chapter: Option<u32>,
    /// Chapter number that resolved it
    #[serde(default)]
    pub resolved_chapter: Option<u32>,
    /// How it was resolved
    #[serde(default)]
    pub resolution_note: Option<String>,
}

/// A proposed status change for a foreshadowing item, parsed from agent output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeshadowingUpdate {
    /// Title of the item the proposal refers to
    pub title: String,
    /// Proposed new status
    pub status: ForeshadowingStatus,
    /// Chapter number the change happened in, when the agent names one
    #[serde(default)]
    pub chapter: Option<u32>,
    /// Free-text note, recorded as the resolution note on resolve
    #[serde(default)]
    pub note: Option<String>,
}
