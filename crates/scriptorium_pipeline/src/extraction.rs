//! Utilities for pulling JSON out of free-form model output.
//!
//! Model answers often wrap JSON in markdown fences or surround it with
//! prose. These helpers find the structured part.

use scriptorium_error::{JsonError, ScriptoriumResult};

/// Extract JSON from a response that may contain markdown or extra text.
///
/// Strategies, in order:
/// 1. Markdown code blocks: ```json ... ```
/// 2. Balanced braces or brackets, whichever opens first
///
/// # Errors
///
/// Returns an error if no JSON-looking span is found.
///
/// # Examples
///
/// ```
/// use scriptorium_pipeline::extract_json;
///
/// let response = "Notes follow.\n```json\n{\"rating\": \"high\"}\n```\n";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"rating\": \"high\"}");
/// ```
pub fn extract_json(response: &str) -> ScriptoriumResult<String> {
    if let Some(json) = extract_from_code_block(response, "json") {
        return Ok(json);
    }

    let bracket_pos = response.find('[');
    let brace_pos = response.find('{');

    let order: [(char, char); 2] = match (bracket_pos, brace_pos) {
        (Some(b), Some(c)) if b < c => [('[', ']'), ('{', '}')],
        (Some(_), None) => [('[', ']'), ('{', '}')],
        _ => [('{', '}'), ('[', ']')],
    };
    for (open, close) in order {
        if let Some(json) = extract_balanced(response, open, close) {
            return Ok(json);
        }
    }

    tracing::debug!(response_length = response.len(), "No JSON found in response");

    Err(JsonError::new(format!(
        "No JSON found in response (length: {})",
        response.len()
    ))
    .into())
}

/// Content of the first fenced block tagged `language`.
///
/// An unterminated fence (truncated output) yields everything after it.
pub fn extract_from_code_block(response: &str, language: &str) -> Option<String> {
    let pattern = format!("```{}", language);
    let start = response.find(&pattern)?;
    let content_start = start + pattern.len();
    match response[content_start..].find("```") {
        Some(end) => Some(response[content_start..content_start + end].trim().to_string()),
        None => Some(response[content_start..].trim().to_string()),
    }
}

/// Extract content between balanced delimiters.
///
/// Finds the first `open` and returns the span up to its matching `close`,
/// ignoring delimiters inside JSON strings.
fn extract_balanced(response: &str, open: char, close: char) -> Option<String> {
    let start = response.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(response[start..start + i + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse JSON into a specific type.
///
/// # Errors
///
/// Returns an error if the text is not valid JSON for `T`.
///
/// # Examples
///
/// ```
/// use scriptorium_pipeline::parse_json;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Note {
///     title: String,
/// }
///
/// let note: Note = parse_json(r#"{"title": "Locked Door"}"#).unwrap();
/// assert_eq!(note.title, "Locked Door");
/// ```
pub fn parse_json<T>(json_str: &str) -> ScriptoriumResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(json_str).map_err(|e| {
        let preview = json_str.chars().take(100).collect::<String>();
        tracing::debug!(error = %e, json_preview = %preview, "JSON parsing failed");
        JsonError::new(format!("Failed to parse JSON: {} (JSON: {}...)", e, preview)).into()
    })
}
