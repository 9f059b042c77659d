//! Assembly of a project's narrative state into one prompt-ready document.

use scriptorium_core::{ChapterRecord, PlotPoint, ProjectSnapshot};
use scriptorium_error::{ScriptoriumResult, StoreError, StoreErrorKind};
use scriptorium_interface::NarrativeStore;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Which optional sections the aggregator renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Render plot points: the project outline and a chapter overlay's own points
    #[serde(default = "enabled")]
    pub include_plot_points: bool,
    /// Render style reference excerpts
    #[serde(default = "enabled")]
    pub include_style_references: bool,
    /// Render the aggregate list of chapter summaries
    #[serde(default = "enabled")]
    pub include_chapter_summaries: bool,
    /// Render the list of chapter synopses
    #[serde(default = "enabled")]
    pub include_chapter_synopses: bool,
    /// Earlier-chapter summaries kept in a chapter overlay
    #[serde(default = "default_summary_window")]
    pub summary_window: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            include_plot_points: true,
            include_style_references: true,
            include_chapter_summaries: true,
            include_chapter_synopses: true,
            summary_window: default_summary_window(),
        }
    }
}

fn enabled() -> bool {
    true
}

fn default_summary_window() -> usize {
    5
}

/// Reads a project snapshot and renders it.
#[derive(Clone)]
pub struct ContextAggregator {
    store: Arc<dyn NarrativeStore>,
    options: ContextOptions,
}

impl ContextAggregator {
    /// Creates an aggregator over a store.
    pub fn new(store: Arc<dyn NarrativeStore>, options: ContextOptions) -> Self {
        Self { store, options }
    }

    /// Active options.
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Fetches the project and renders its context, optionally chapter-scoped.
    ///
    /// # Errors
    ///
    /// Fails if the project or the requested chapter does not exist.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn aggregate(
        &self,
        project_id: &str,
        chapter_id: Option<&str>,
    ) -> ScriptoriumResult<String> {
        let snapshot = self.store.project_snapshot(project_id).await?;
        render_context(&snapshot, chapter_id, &self.options)
    }
}

/// Renders a snapshot into a single ordered document.
///
/// Sections appear in a fixed order and empty sections are omitted, so the
/// same snapshot and options always produce byte-identical text.
///
/// # Errors
///
/// Fails if `chapter_id` names a chapter the snapshot does not contain.
pub fn render_context(
    snapshot: &ProjectSnapshot,
    chapter_id: Option<&str>,
    options: &ContextOptions,
) -> ScriptoriumResult<String> {
    let chapter = match chapter_id {
        Some(id) => Some(snapshot.chapter(id).ok_or_else(|| {
            StoreError::new(StoreErrorKind::ChapterNotFound(id.to_string()))
        })?),
        None => None,
    };

    let mut chapters: Vec<&ChapterRecord> = snapshot.chapters.iter().collect();
    chapters.sort_by_key(|c| c.number);

    let mut sections: Vec<String> = Vec::new();

    if let Some(synopsis) = non_blank(snapshot.synopsis.as_deref()) {
        sections.push(format!("## Synopsis\n\n{}", synopsis));
    }

    if let Some(chapter) = chapter {
        if let Some(block) = chapter_block(snapshot, &chapters, chapter, options) {
            sections.push(block);
        }
    }

    if !snapshot.characters.is_empty() {
        let mut out = String::from("## Characters\n");
        for character in &snapshot.characters {
            let _ = write!(out, "\n- **{}**", character.name);
            if let Some(role) = non_blank(character.role.as_deref()) {
                let _ = write!(out, " ({})", role);
            }
            if !character.description.trim().is_empty() {
                let _ = write!(out, ": {}", character.description.trim());
            }
        }
        sections.push(out);
    }

    if !snapshot.world_entries.is_empty() {
        let mut out = String::from("## World\n");
        for entry in &snapshot.world_entries {
            let _ = write!(out, "\n- [{}] **{}**", entry.category, entry.title);
            if !entry.content.trim().is_empty() {
                let _ = write!(out, ": {}", entry.content.trim());
            }
        }
        sections.push(out);
    }

    let open: Vec<_> = snapshot
        .foreshadowing
        .iter()
        .filter(|f| f.status.is_open())
        .collect();
    if !open.is_empty() {
        let mut out = String::from("## Unresolved Foreshadowing\n");
        for item in open {
            let _ = write!(out, "\n- **{}** [{}]", item.title, item.status);
            match (item.planted_chapter, item.target_chapter) {
                (Some(p), Some(t)) => {
                    let _ = write!(out, " (planted ch. {}, payoff ch. {})", p, t);
                }
                (Some(p), None) => {
                    let _ = write!(out, " (planted ch. {})", p);
                }
                (None, Some(t)) => {
                    let _ = write!(out, " (payoff ch. {})", t);
                }
                (None, None) => {}
            }
            if !item.description.trim().is_empty() {
                let _ = write!(out, ": {}", item.description.trim());
            }
        }
        sections.push(out);
    }

    if options.include_plot_points && !snapshot.plot_points.is_empty() {
        let mut points: Vec<&PlotPoint> = snapshot.plot_points.iter().collect();
        points.sort_by_key(|p| (p.chapter.unwrap_or(u32::MAX), p.position));
        let mut out = String::from("## Plot Outline\n");
        for point in points {
            match point.chapter {
                Some(n) => {
                    let _ = write!(out, "\n- (Chapter {}) {}", n, point.title);
                }
                None => {
                    let _ = write!(out, "\n- {}", point.title);
                }
            }
            if !point.description.trim().is_empty() {
                let _ = write!(out, ": {}", point.description.trim());
            }
        }
        sections.push(out);
    }

    if options.include_chapter_synopses {
        let lines = chapter_lines(&chapters, |c| c.synopsis.as_deref());
        if !lines.is_empty() {
            sections.push(format!("## Chapter Synopses\n\n{}", lines));
        }
    }

    if options.include_chapter_summaries {
        let lines = chapter_lines(&chapters, |c| c.summary.as_deref());
        if !lines.is_empty() {
            sections.push(format!("## Chapter Summaries\n\n{}", lines));
        }
    }

    if !snapshot.glossary.is_empty() {
        let mut out = String::from("## Glossary\n");
        for term in &snapshot.glossary {
            let _ = write!(out, "\n- **{}**: {}", term.term, term.definition.trim());
        }
        sections.push(out);
    }

    if options.include_style_references && !snapshot.style_references.is_empty() {
        let mut out = String::from("## Style References");
        for reference in &snapshot.style_references {
            let _ = write!(out, "\n\n### {}\n\n{}", reference.title, reference.excerpt.trim());
        }
        sections.push(out);
    }

    debug!(
        project_id = %snapshot.project_id,
        sections = sections.len(),
        "Rendered project context"
    );

    Ok(sections.join("\n\n"))
}

/// This chapter's synopsis and (when enabled) plot points, the predecessor's summary, then
/// a bounded window of earlier summaries in ascending chapter order.
fn chapter_block(
    snapshot: &ProjectSnapshot,
    chapters: &[&ChapterRecord],
    chapter: &ChapterRecord,
    options: &ContextOptions,
) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(synopsis) = non_blank(chapter.synopsis.as_deref()) {
        parts.push(format!("### Chapter Synopsis\n\n{}", synopsis));
    }

    let mut points: Vec<&PlotPoint> = snapshot
        .plot_points
        .iter()
        .filter(|p| options.include_plot_points && p.chapter == Some(chapter.number))
        .collect();
    points.sort_by_key(|p| p.position);
    if !points.is_empty() {
        let mut out = String::from("### Chapter Plot Points\n");
        for point in points {
            let _ = write!(out, "\n- {}", point.title);
            if !point.description.trim().is_empty() {
                let _ = write!(out, ": {}", point.description.trim());
            }
        }
        parts.push(out);
    }

    let earlier: Vec<&ChapterRecord> = chapters
        .iter()
        .copied()
        .filter(|c| c.number < chapter.number)
        .collect();

    if let Some((previous, rest)) = earlier.split_last() {
        if let Some(summary) = non_blank(previous.summary.as_deref()) {
            parts.push(format!(
                "### Previous Chapter Summary (Chapter {})\n\n{}",
                previous.number, summary
            ));
        }

        let with_summary: Vec<&&ChapterRecord> = rest
            .iter()
            .filter(|c| non_blank(c.summary.as_deref()).is_some())
            .collect();
        let skip = with_summary.len().saturating_sub(options.summary_window);
        let mut out = String::new();
        for c in with_summary.into_iter().skip(skip) {
            let _ = write!(
                out,
                "\n- Chapter {}: {}",
                c.number,
                c.summary.as_deref().unwrap_or_default().trim()
            );
        }
        if !out.is_empty() {
            parts.push(format!("### Earlier Chapter Summaries\n{}", out));
        }
    }

    if parts.is_empty() {
        return None;
    }

    let heading = if chapter.title.trim().is_empty() {
        format!("## Current Chapter: {}", chapter.number)
    } else {
        format!("## Current Chapter: {}. {}", chapter.number, chapter.title.trim())
    };
    Some(format!("{}\n\n{}", heading, parts.join("\n\n")))
}

fn chapter_lines<'a>(
    chapters: &[&'a ChapterRecord],
    field: impl Fn(&'a ChapterRecord) -> Option<&'a str>,
) -> String {
    chapters
        .iter()
        .filter_map(|&c| {
            non_blank(field(c)).map(|text| {
                if c.title.trim().is_empty() {
                    format!("- Chapter {}: {}", c.number, text)
                } else {
                    format!("- Chapter {} ({}): {}", c.number, c.title.trim(), text)
                }
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::{Character, ForeshadowingItem, ForeshadowingStatus};

    fn chapter(number: u32, summary: &str) -> ChapterRecord {
        ChapterRecord {
            id: format!("ch{}", number),
            number,
            title: String::new(),
            synopsis: None,
            summary: Some(summary.to_string()),
            content: None,
        }
    }

    #[test]
    fn test_empty_snapshot_renders_nothing() {
        let snapshot = ProjectSnapshot {
            project_id: "p".into(),
            ..Default::default()
        };
        let text = render_context(&snapshot, None, &ContextOptions::default()).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_summary_window_is_bounded() {
        let snapshot = ProjectSnapshot {
            project_id: "p".into(),
            chapters: (1..=9).map(|n| chapter(n, &format!("S{}", n))).collect(),
            ..Default::default()
        };
        let options = ContextOptions {
            include_chapter_summaries: false,
            ..Default::default()
        };
        let text = render_context(&snapshot, Some("ch9"), &options).unwrap();

        assert!(text.contains("### Previous Chapter Summary (Chapter 8)\n\nS8"));
        // window of five before the predecessor: chapters 3..=7
        assert!(!text.contains("Chapter 2: S2"));
        assert!(text.contains("- Chapter 3: S3"));
        assert!(text.contains("- Chapter 7: S7"));
        let three = text.find("Chapter 3: S3").unwrap();
        let seven = text.find("Chapter 7: S7").unwrap();
        assert!(three < seven);
    }

    #[test]
    fn test_closed_foreshadowing_is_omitted() {
        let item = |title: &str, status| ForeshadowingItem {
            id: title.to_lowercase(),
            title: title.to_string(),
            description: String::new(),
            status,
            planted_chapter: Some(1),
            target_chapter: None,
            resolved_chapter: None,
            resolution_note: None,
        };
        let snapshot = ProjectSnapshot {
            project_id: "p".into(),
            characters: vec![Character {
                name: "Mara".into(),
                role: Some("keeper".into()),
                description: "Tends the light.".into(),
            }],
            foreshadowing: vec![
                item("Locked Door", ForeshadowingStatus::Hinted),
                item("Old Debt", ForeshadowingStatus::Resolved),
                item("Lost Ring", ForeshadowingStatus::Abandoned),
            ],
            ..Default::default()
        };
        let text = render_context(&snapshot, None, &ContextOptions::default()).unwrap();
        assert!(text.contains("**Locked Door** [hinted]"));
        assert!(!text.contains("Old Debt"));
        assert!(!text.contains("Lost Ring"));
        assert!(text.find("## Characters").unwrap() < text.find("## Unresolved").unwrap());
    }

    #[test]
    fn test_unknown_chapter_is_error() {
        let snapshot = ProjectSnapshot::default();
        assert!(render_context(&snapshot, Some("nope"), &ContextOptions::default()).is_err());
    }
}
