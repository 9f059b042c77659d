//! Detection of the "needs human review" flag in agent output.

use crate::extraction::{extract_from_code_block, extract_json};
use regex::Regex;
use scriptorium_error::{ConfigError, ScriptoriumResult};
use serde_json::Value;

/// Default flag name agents use to request consultation.
pub const DEFAULT_ESCALATION_MARKER: &str = "requires_consultation";

/// Finds a boolean escalation flag in raw agent output.
///
/// The flag counts when a JSON block (or the whole document) carries it as
/// `true` or `"true"` at top level, or when the plain text reads like
/// `marker: true` / `marker = true`. The camelCase spelling of the marker is
/// accepted too.
///
/// # Examples
///
/// ```
/// use scriptorium_pipeline::EscalationDetector;
///
/// let detector = EscalationDetector::default();
/// assert!(detector.detect("Proposal ready.\n```json\n{\"requires_consultation\": true}\n```"));
/// assert!(detector.detect("REQUIRES_CONSULTATION = TRUE"));
/// assert!(!detector.detect("requires_consultation: false"));
/// ```
#[derive(Debug, Clone)]
pub struct EscalationDetector {
    keys: [String; 2],
    pattern: Regex,
}

impl EscalationDetector {
    /// Builds a detector for `marker`.
    ///
    /// # Errors
    ///
    /// Fails if the marker is blank.
    pub fn new(marker: &str) -> ScriptoriumResult<Self> {
        let marker = marker.trim();
        if marker.is_empty() {
            return Err(ConfigError::new("Escalation marker must not be empty").into());
        }
        let camel = to_camel_case(marker);
        let pattern = Regex::new(&format!(
            r#"(?i)["']?(?:{}|{})["']?\s*[:=]\s*["']?true\b"#,
            regex::escape(marker),
            regex::escape(&camel)
        ))
        .map_err(|e| ConfigError::new(format!("Invalid escalation marker: {}", e)))?;

        Ok(Self {
            keys: [marker.to_string(), camel],
            pattern,
        })
    }

    /// The configured marker.
    pub fn marker(&self) -> &str {
        &self.keys[0]
    }

    /// Whether `raw` raises the flag.
    pub fn detect(&self, raw: &str) -> bool {
        if let Some(flag) = self.structured_flag(raw) {
            return flag;
        }
        self.pattern.is_match(raw)
    }

    /// Reads the flag from JSON, if the output has a JSON object carrying it.
    fn structured_flag(&self, raw: &str) -> Option<bool> {
        let candidates = [
            extract_from_code_block(raw, "json"),
            Some(raw.trim().to_string()),
            extract_json(raw).ok(),
        ];
        candidates
            .into_iter()
            .flatten()
            .filter_map(|text| serde_json::from_str::<Value>(&text).ok())
            .find_map(|value| {
                let obj = value.as_object()?;
                self.keys.iter().find_map(|key| match obj.get(key)? {
                    Value::Bool(b) => Some(*b),
                    Value::String(s) => Some(s.trim().eq_ignore_ascii_case("true")),
                    _ => None,
                })
            })
    }
}

impl Default for EscalationDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ESCALATION_MARKER)
            .expect("default escalation marker compiles to a valid pattern")
    }
}

/// Shorthand for a one-off check.
pub fn detect_escalation(raw: &str, marker: &str) -> bool {
    EscalationDetector::new(marker)
        .map(|d| d.detect(raw))
        .unwrap_or(false)
}

fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for ch in snake.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
