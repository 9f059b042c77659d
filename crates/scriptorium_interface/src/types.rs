//! Core type definitions for the Scriptorium interface.

use scriptorium_core::TokenUsage;
use serde::{Deserialize, Serialize};

/// A single chunk from a streaming completion.
///
/// # Examples
///
/// ```
/// use scriptorium_interface::StreamChunk;
///
/// let chunk = StreamChunk::builder()
///     .text("It was a dark")
///     .build()
///     .unwrap();
/// assert!(!chunk.is_final());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_builder::Builder,
    derive_getters::Getters,
)]
#[builder(setter(into))]
pub struct StreamChunk {
    /// Incremental text
    #[builder(default)]
    text: String,
    /// Whether this is the final chunk
    #[builder(default)]
    is_final: bool,
    /// Finish reason if final
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    finish_reason: Option<FinishReason>,
    /// Usage, usually only on the final chunk
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<TokenUsage>,
}

impl StreamChunk {
    /// Creates a chunk builder.
    pub fn builder() -> StreamChunkBuilder {
        StreamChunkBuilder::default()
    }

    /// A non-final text chunk.
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            finish_reason: None,
            usage: None,
        }
    }

    /// A final chunk carrying the remaining text and any usage.
    pub fn last(text: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            finish_reason: Some(FinishReason::Stop),
            usage,
        }
    }
}

/// Why generation stopped.
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
    strum::EnumIter,
)]
pub enum FinishReason {
    /// Model completed naturally.
    Stop,
    /// Hit max_tokens limit.
    Length,
    /// Content was filtered.
    ContentFilter,
    /// Other/unknown reason.
    Other,
}

impl FinishReason {
    /// Maps an OpenAI-style `finish_reason` string.
    pub fn from_provider(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}
