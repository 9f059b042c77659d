//! Narrative entities that make up a project snapshot.

use crate::ForeshadowingItem;
use serde::{Deserialize, Serialize};

/// A character in the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Name, unique within a project
    pub name: String,
    /// Narrative role (protagonist, mentor, ...)
    #[serde(default)]
    pub role: Option<String>,
    /// Description
    #[serde(default)]
    pub description: String,
}

/// A world-building entry (location, faction, magic system, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldEntry {
    /// Category the entry is filed under
    pub category: String,
    /// Title, unique within its category
    pub title: String,
    /// Content
    #[serde(default)]
    pub content: String,
}

/// A plot point, optionally pinned to a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotPoint {
    /// Short title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Chapter number the point belongs to
    #[serde(default)]
    pub chapter: Option<u32>,
    /// Ordering key within the outline
    #[serde(default)]
    pub position: u32,
}

/// A glossary term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    /// The term
    pub term: String,
    /// Its definition
    pub definition: String,
}

/// A reference passage illustrating the desired prose style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleReference {
    /// Label of the sample
    pub title: String,
    /// The sample text
    pub excerpt: String,
}

/// A chapter and the text artifacts known about it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// Store identifier
    pub id: String,
    /// 1-based position in the book
    pub number: u32,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Planned synopsis
    #[serde(default)]
    pub synopsis: Option<String>,
    /// Detailed summary of the written chapter
    #[serde(default)]
    pub summary: Option<String>,
    /// Drafted prose
    #[serde(default)]
    pub content: Option<String>,
}

/// Read-only snapshot of a project's narrative state, fetched once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Project identifier
    pub project_id: String,
    /// Working title
    #[serde(default)]
    pub title: String,
    /// Overall synopsis of the book
    #[serde(default)]
    pub synopsis: Option<String>,
    /// Characters
    #[serde(default)]
    pub characters: Vec<Character>,
    /// World-building entries
    #[serde(default)]
    pub world_entries: Vec<WorldEntry>,
    /// Plot outline
    #[serde(default)]
    pub plot_points: Vec<PlotPoint>,
    /// All foreshadowing items, open or not
    #[serde(default)]
    pub foreshadowing: Vec<ForeshadowingItem>,
    /// Glossary
    #[serde(default)]
    pub glossary: Vec<GlossaryTerm>,
    /// Style samples
    #[serde(default)]
    pub style_references: Vec<StyleReference>,
    /// Chapters
    #[serde(default)]
    pub chapters: Vec<ChapterRecord>,
}

impl ProjectSnapshot {
    /// Looks up a chapter by id.
    pub fn chapter(&self, chapter_id: &str) -> Option<&ChapterRecord> {
        self.chapters.iter().find(|c| c.id == chapter_id)
    }
}
