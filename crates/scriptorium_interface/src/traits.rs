//! Trait definitions for completion backends.

use crate::StreamChunk;
use async_trait::async_trait;
use futures_util::stream::Stream;
use scriptorium_core::{GenerateRequest, GenerateResponse};
use scriptorium_error::ScriptoriumResult;
use std::pin::Pin;

/// A boxed stream of completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = ScriptoriumResult<StreamChunk>> + Send>>;

/// Core trait every text-completion backend implements.
///
/// The pipeline treats the model as an opaque service: a request goes in,
/// text and usage come out, and any failure is reported as an error rather
/// than an empty success.
#[async_trait]
pub trait CompletionDriver: Send + Sync {
    /// Generate a complete response.
    async fn generate(&self, req: &GenerateRequest) -> ScriptoriumResult<GenerateResponse>;

    /// Generate a streaming response.
    ///
    /// Backends without native streaming get a single final chunk holding
    /// the whole response.
    async fn generate_stream(&self, req: &GenerateRequest) -> ScriptoriumResult<ChunkStream> {
        let response = self.generate(req).await?;
        let chunk = StreamChunk::last(response.text, response.usage);
        Ok(Box::pin(futures_util::stream::iter(vec![Ok(chunk)])))
    }

    /// Provider name (e.g., "openai", "ollama").
    fn provider_name(&self) -> &'static str;

    /// Default model identifier.
    fn model_name(&self) -> &str;
}
