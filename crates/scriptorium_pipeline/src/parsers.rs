//! Best-effort parsers for agent output.
//!
//! Every parser walks the same three tiers: an embedded ```` ```json ````
//! block, then the whole document (or the first balanced JSON value in it),
//! then a fallback. None of them can fail.

use crate::extraction::{extract_from_code_block, extract_json};
use scriptorium_core::{
    ConsistencyIssue, ConsistencyRating, ConsistencyResult, ExtractedEntities,
    ForeshadowingStatus, ForeshadowingUpdate, IssueSeverity, NewCharacter, NewWorldEntry,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::debug;

/// Upper bound on the raw text copied into a fallback note.
pub const FALLBACK_NOTE_MAX_CHARS: usize = 500;

const BLOCK_MARKER: &str = "json";

/// Which tier produced a parse result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParseSource {
    /// Decoded from a fenced ```` ```json ```` block
    EmbeddedBlock,
    /// Decoded from the document as a whole
    WholeDocument,
    /// Nothing decodable; value was synthesised
    Fallback,
}

/// A parsed value tagged with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome<T> {
    /// The parsed value
    pub value: T,
    /// Tier that produced it
    pub source: ParseSource,
}

impl<T> ParseOutcome<T> {
    /// Whether the value came from the fallback tier.
    pub fn is_fallback(&self) -> bool {
        self.source == ParseSource::Fallback
    }

    /// Discards the tier tag.
    pub fn into_inner(self) -> T {
        self.value
    }
}

enum Tier {
    EmbeddedBlock,
    WholeDocument,
    Fallback,
}

/// Walks the tiers until `decode` accepts a JSON value.
fn decode_tiers<T>(raw: &str, decode: impl Fn(&Value) -> Option<T>) -> Option<(T, ParseSource)> {
    let mut tier = Tier::EmbeddedBlock;
    loop {
        tier = match tier {
            Tier::EmbeddedBlock => {
                let decoded = extract_from_code_block(raw, BLOCK_MARKER)
                    .and_then(|block| serde_json::from_str::<Value>(&block).ok())
                    .and_then(|value| decode(&value));
                match decoded {
                    Some(value) => return Some((value, ParseSource::EmbeddedBlock)),
                    None => Tier::WholeDocument,
                }
            }
            Tier::WholeDocument => {
                let decoded = serde_json::from_str::<Value>(raw.trim())
                    .ok()
                    .or_else(|| {
                        extract_json(raw)
                            .ok()
                            .and_then(|json| serde_json::from_str::<Value>(&json).ok())
                    })
                    .and_then(|value| decode(&value));
                match decoded {
                    Some(value) => return Some((value, ParseSource::WholeDocument)),
                    None => Tier::Fallback,
                }
            }
            Tier::Fallback => return None,
        }
    }
}

/// Parses a continuity check.
///
/// The fallback is a result holding one note with a truncated copy of the
/// raw text and a keyword-guessed severity.
///
/// # Examples
///
/// ```
/// use scriptorium_core::{ConsistencyRating, IssueSeverity};
/// use scriptorium_pipeline::{ParseSource, parse_consistency};
///
/// let outcome = parse_consistency("Critical: the lighthouse moved coasts.");
/// assert_eq!(outcome.source, ParseSource::Fallback);
/// assert_eq!(outcome.value.rating, ConsistencyRating::Medium);
/// assert_eq!(outcome.value.issues[0].severity, IssueSeverity::Error);
/// ```
pub fn parse_consistency(raw: &str) -> ParseOutcome<ConsistencyResult> {
    match decode_tiers(raw, decode_consistency) {
        Some((value, source)) => ParseOutcome { value, source },
        None => {
            debug!(raw_len = raw.len(), "No structured consistency report, using fallback note");
            ParseOutcome {
                value: ConsistencyResult {
                    rating: ConsistencyRating::Medium,
                    issues: vec![ConsistencyIssue {
                        severity: classify_severity(raw),
                        category: "general".to_string(),
                        description: truncate_note(raw, FALLBACK_NOTE_MAX_CHARS),
                        location: None,
                        suggestion: None,
                    }],
                    ..Default::default()
                },
                source: ParseSource::Fallback,
            }
        }
    }
}

/// Parses foreshadowing status proposals. Falls back to an empty list.
pub fn parse_foreshadowing_updates(raw: &str) -> ParseOutcome<Vec<ForeshadowingUpdate>> {
    let decode = |value: &Value| match value {
        Value::Array(items) => Some(decode_updates(items)),
        Value::Object(obj) => {
            list(obj, &["foreshadowing_updates", "foreshadowingUpdates", "updates"])
                .map(|items| decode_updates(items))
        }
        _ => None,
    };
    match decode_tiers(raw, decode) {
        Some((value, source)) => ParseOutcome { value, source },
        None => ParseOutcome {
            value: Vec::new(),
            source: ParseSource::Fallback,
        },
    }
}

/// Parses newly mentioned characters and world entries. Falls back to empty lists.
pub fn parse_new_entities(raw: &str) -> ParseOutcome<ExtractedEntities> {
    let decode = |value: &Value| {
        let obj = value.as_object()?;
        let characters = list(obj, &["new_characters", "newCharacters", "characters"]);
        let world = list(
            obj,
            &[
                "new_world_entries",
                "newWorldEntries",
                "world_entries",
                "worldEntries",
                "new_world_settings",
            ],
        );
        if characters.is_none() && world.is_none() {
            return None;
        }
        Some(ExtractedEntities {
            characters: characters.map(|c| decode_characters(c)).unwrap_or_default(),
            world_entries: world.map(|w| decode_world_entries(w)).unwrap_or_default(),
        })
    };
    match decode_tiers(raw, decode) {
        Some((value, source)) => ParseOutcome { value, source },
        None => ParseOutcome {
            value: ExtractedEntities::default(),
            source: ParseSource::Fallback,
        },
    }
}

const RATING_KEYS: &[&str] = &["rating", "overall_rating", "overallRating", "consistency"];
const ISSUE_KEYS: &[&str] = &["issues"];
const UPDATE_KEYS: &[&str] = &["foreshadowing_updates", "foreshadowingUpdates"];
const CHARACTER_KEYS: &[&str] = &["new_characters", "newCharacters"];
const WORLD_KEYS: &[&str] = &[
    "new_world_entries",
    "newWorldEntries",
    "new_world_settings",
    "newWorldSettings",
];

/// Accepts only objects carrying at least one report key, so a stray inline
/// object in prose does not pass for a clean report.
fn decode_consistency(value: &Value) -> Option<ConsistencyResult> {
    let obj = value.as_object()?;
    let is_report = [RATING_KEYS, ISSUE_KEYS, UPDATE_KEYS, CHARACTER_KEYS, WORLD_KEYS]
        .iter()
        .flat_map(|keys| keys.iter())
        .any(|key| obj.contains_key(*key));
    if !is_report {
        return None;
    }

    let rating = text(obj, RATING_KEYS)
        .map(|r| parse_rating(&r))
        .unwrap_or_default();

    let issues = list(obj, ISSUE_KEYS)
        .map(|items| items.iter().filter_map(decode_issue).collect())
        .unwrap_or_default();

    let foreshadowing_updates = list(obj, UPDATE_KEYS)
        .map(|items| decode_updates(items))
        .unwrap_or_default();

    let new_characters = list(obj, CHARACTER_KEYS)
        .map(|items| decode_characters(items))
        .unwrap_or_default();

    let new_world_entries = list(obj, WORLD_KEYS)
        .map(|items| decode_world_entries(items))
        .unwrap_or_default();

    Some(ConsistencyResult {
        rating,
        issues,
        foreshadowing_updates,
        new_characters,
        new_world_entries,
    })
}

fn decode_issue(value: &Value) -> Option<ConsistencyIssue> {
    let obj = value.as_object()?;
    let description = text(obj, &["description", "message", "issue"])?;
    Some(ConsistencyIssue {
        severity: text(obj, &["severity", "level"])
            .map(|s| parse_severity(&s))
            .unwrap_or_default(),
        category: text(obj, &["category", "type"]).unwrap_or_else(|| "general".to_string()),
        description,
        location: text(obj, &["location"]),
        suggestion: text(obj, &["suggestion", "fix"]),
    })
}

fn decode_updates(items: &[Value]) -> Vec<ForeshadowingUpdate> {
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let title = text(obj, &["title", "name"])?;
            let status_text = text(obj, &["status", "new_status", "newStatus"])?;
            let Some(status) = parse_status(&status_text) else {
                debug!(title = %title, status = %status_text, "Dropping proposal with unknown status");
                return None;
            };
            Some(ForeshadowingUpdate {
                title,
                status,
                chapter: number(obj, &["chapter", "resolved_chapter", "resolvedChapter"]),
                note: text(obj, &["note", "resolution_note", "resolutionNote", "resolution"]),
            })
        })
        .collect()
}

fn decode_characters(items: &[Value]) -> Vec<NewCharacter> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(NewCharacter {
                name: name.trim().to_string(),
                role: None,
                description: String::new(),
            }),
            Value::Object(obj) => Some(NewCharacter {
                name: text(obj, &["name"])?,
                role: text(obj, &["role"]),
                description: text(obj, &["description"]).unwrap_or_default(),
            }),
            _ => None,
        })
        .collect()
}

fn decode_world_entries(items: &[Value]) -> Vec<NewWorldEntry> {
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(NewWorldEntry {
                category: text(obj, &["category", "type"]).unwrap_or_else(|| "general".to_string()),
                title: text(obj, &["title", "name"])?,
                content: text(obj, &["content", "description"]).unwrap_or_default(),
            })
        })
        .collect()
}

fn list<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a [Value]> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
        .map(Vec::as_slice)
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn number(obj: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn parse_rating(rating: &str) -> ConsistencyRating {
    match rating.trim().to_lowercase().as_str() {
        "high" => ConsistencyRating::High,
        "low" => ConsistencyRating::Low,
        _ => ConsistencyRating::Medium,
    }
}

fn parse_severity(severity: &str) -> IssueSeverity {
    match severity.trim().to_lowercase().as_str() {
        "error" | "critical" | "major" => IssueSeverity::Error,
        "warning" | "warn" | "caution" | "minor" => IssueSeverity::Warning,
        _ => IssueSeverity::Info,
    }
}

fn parse_status(status: &str) -> Option<ForeshadowingStatus> {
    let normalized = status.trim().replace([' ', '-'], "_");
    ForeshadowingStatus::from_str(&normalized).ok()
}

/// Keyword guess used only by the fallback tier.
pub fn classify_severity(raw: &str) -> IssueSeverity {
    let lower = raw.to_lowercase();
    if lower.contains("error") || lower.contains("critical") {
        IssueSeverity::Error
    } else if lower.contains("warning") || lower.contains("caution") {
        IssueSeverity::Warning
    } else {
        IssueSeverity::Info
    }
}

/// Trims and bounds `raw` to `max_chars` characters, marking truncation with an ellipsis.
pub fn truncate_note(raw: &str, max_chars: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_block_with_camel_case_keys() {
        let raw = r#"Checked the draft.

```json
{"overallRating": "low",
 "issues": [{"severity": "warning", "category": "timeline", "description": "Two Tuesdays."}],
 "foreshadowingUpdates": [{"title": "Locked Door", "status": "partially resolved"}],
 "newCharacters": [{"name": "Ivo"}]}
```"#;
        let outcome = parse_consistency(raw);
        assert_eq!(outcome.source, ParseSource::EmbeddedBlock);
        let result = outcome.value;
        assert_eq!(result.rating, ConsistencyRating::Low);
        assert_eq!(result.issues[0].severity, IssueSeverity::Warning);
        assert_eq!(
            result.foreshadowing_updates[0].status,
            ForeshadowingStatus::PartiallyResolved
        );
        assert_eq!(result.new_characters[0].name, "Ivo");
    }

    #[test]
    fn test_whole_document_json() {
        let outcome = parse_consistency(r#"{"rating": "high", "issues": []}"#);
        assert_eq!(outcome.source, ParseSource::WholeDocument);
        assert_eq!(outcome.value.rating, ConsistencyRating::High);
        assert!(outcome.value.issues.is_empty());
    }

    #[test]
    fn test_broken_block_falls_through_to_note() {
        let raw = "```json\n{\"rating\": \"high\", \n```\nA warning about pacing.";
        let outcome = parse_consistency(raw);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.value.issues.len(), 1);
        assert_eq!(outcome.value.issues[0].severity, IssueSeverity::Warning);
    }

    #[test]
    fn test_stray_object_in_prose_keeps_the_note() {
        let raw = "Critical error: chapter 4 contradicts chapter 2, the ledger entry {\"year\": 1842} was already burned.";
        let outcome = parse_consistency(raw);
        assert_eq!(outcome.source, ParseSource::Fallback);
        assert_eq!(outcome.value.issues.len(), 1);
        assert_eq!(outcome.value.issues[0].severity, IssueSeverity::Error);
        assert!(outcome.value.issues[0].description.contains("1842"));
    }

    #[test]
    fn test_block_without_report_keys_is_not_a_report() {
        let raw = "Caution: the dates drift.\n```json\n{\"year\": 1842}\n```";
        let outcome = parse_consistency(raw);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.value.issues[0].severity, IssueSeverity::Warning);
    }

    #[test]
    fn test_inline_report_object_is_still_decoded() {
        let raw = r#"Verdict: {"rating": "low", "issues": [{"severity": "error", "description": "Dead man speaks."}]}"#;
        let outcome = parse_consistency(raw);
        assert_eq!(outcome.source, ParseSource::WholeDocument);
        assert_eq!(outcome.value.rating, ConsistencyRating::Low);
        assert_eq!(outcome.value.issues[0].description, "Dead man speaks.");
    }

    #[test]
    fn test_fallback_note_is_bounded() {
        let raw = "é".repeat(FALLBACK_NOTE_MAX_CHARS + 50);
        let outcome = parse_consistency(&raw);
        let note = &outcome.value.issues[0].description;
        assert_eq!(note.chars().count(), FALLBACK_NOTE_MAX_CHARS + 1);
        assert!(note.ends_with('…'));
        assert_eq!(outcome.value.issues[0].severity, IssueSeverity::Info);
    }

    #[test]
    fn test_unknown_status_drops_only_that_proposal() {
        let raw = r#"[{"title": "A", "status": "simmering"}, {"title": "B", "status": "Resolved", "chapter": 7}]"#;
        let outcome = parse_foreshadowing_updates(raw);
        assert_eq!(outcome.value.len(), 1);
        assert_eq!(outcome.value[0].title, "B");
        assert_eq!(outcome.value[0].chapter, Some(7));
    }

    #[test]
    fn test_entities_fallback_is_empty() {
        let outcome = parse_new_entities("Nobody new appears.");
        assert!(outcome.is_fallback());
        assert!(outcome.value.is_empty());
    }

    #[test]
    fn test_entities_from_prose_with_inline_json() {
        let raw = r#"New faces: {"new_characters": ["Ivo", {"name": "Sela", "role": "smuggler"}],
            "new_world_entries": [{"category": "place", "title": "Gull Reach"}]}"#;
        let outcome = parse_new_entities(raw);
        assert_eq!(outcome.source, ParseSource::WholeDocument);
        assert_eq!(outcome.value.characters.len(), 2);
        assert_eq!(outcome.value.characters[1].role.as_deref(), Some("smuggler"));
        assert_eq!(outcome.value.world_entries[0].title, "Gull Reach");
    }
}
