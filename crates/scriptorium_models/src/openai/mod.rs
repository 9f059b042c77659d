//! OpenAI-compatible chat completions client.

mod client;
mod conversion;
mod dto;
mod sse;

pub use client::OpenAiCompatClient;
pub use dto::{
    ChatChoice, ChatChunk, ChatChunkChoice, ChatDelta, ChatMessage, ChatRequest,
    ChatRequestBuilder, ChatResponse, ChatUsage,
};
pub use sse::SseDecoder;
