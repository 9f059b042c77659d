//! The specialised agents a pipeline can chain together.

use serde::{Deserialize, Serialize};

/// The kind of agent that executes a pipeline step.
///
/// # Examples
///
/// ```
/// use scriptorium_core::AgentRole;
/// use std::str::FromStr;
///
/// assert_eq!(AgentRole::ContinuityChecker.to_string(), "continuity_checker");
/// assert_eq!(AgentRole::from_str("plot_architect").unwrap(), AgentRole::PlotArchitect);
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
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentRole {
    /// Breaks the work into a plan
    Planner,
    /// Shapes plot structure and foreshadowing
    PlotArchitect,
    /// Develops settings, places and lore
    WorldBuilder,
    /// Develops and tracks characters
    CharacterManager,
    /// Drafts chapter prose
    Writer,
    /// Revises drafts
    Editor,
    /// Cross-checks a draft against the established narrative
    ContinuityChecker,
    /// Repairs issues found by the continuity checker
    Fixer,
}

impl AgentRole {
    /// Human-readable label used in prompt section headings.
    pub fn label(&self) -> &'static str {
        match self {
            AgentRole::Planner => "Planner",
            AgentRole::PlotArchitect => "Plot Architect",
            AgentRole::WorldBuilder => "World Builder",
            AgentRole::CharacterManager => "Character Manager",
            AgentRole::Writer => "Writer",
            AgentRole::Editor => "Editor",
            AgentRole::ContinuityChecker => "Continuity Checker",
            AgentRole::Fixer => "Fixer",
        }
    }

    /// Roles whose output is a chapter draft.
    pub fn produces_prose(&self) -> bool {
        matches!(self, AgentRole::Writer | AgentRole::Fixer)
    }
}
