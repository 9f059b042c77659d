//! Completion service clients for Scriptorium.
//!
//! One client speaks the OpenAI-compatible chat completions protocol, which
//! covers OpenAI itself plus the local servers (llama.cpp, vLLM, Ollama's
//! `/v1` endpoint) that mirror it.
//!
//! ```no_run
//! use scriptorium_core::{GenerateRequest, Message};
//! use scriptorium_interface::CompletionDriver;
//! use scriptorium_models::OpenAiCompatClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiCompatClient::from_env(
//!     "https://api.openai.com/v1",
//!     "gpt-4o-mini",
//!     "OPENAI_API_KEY",
//! )?;
//! let request = GenerateRequest::builder()
//!     .messages(vec![Message::user("Name a lighthouse keeper.")])
//!     .build()?;
//! let response = client.generate(&request).await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod openai;

pub use openai::{
    ChatChunk, ChatChunkChoice, ChatChoice, ChatDelta, ChatMessage, ChatRequest,
    ChatRequestBuilder, ChatResponse, ChatUsage, OpenAiCompatClient, SseDecoder,
};
