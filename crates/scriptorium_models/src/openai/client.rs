//! OpenAI-compatible chat completions driver using reqwest.

use crate::openai::{ChatChunk, ChatResponse, SseDecoder, conversion};
use async_trait::async_trait;
use futures_util::StreamExt;
use scriptorium_core::{GenerateRequest, GenerateResponse};
use scriptorium_error::{CompletionError, CompletionErrorKind, ScriptoriumResult};
use scriptorium_interface::{ChunkStream, CompletionDriver};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Client for any server that speaks the OpenAI chat completions protocol.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAiCompatClient {
    /// Creates a client with an explicit (possibly absent) API key.
    ///
    /// Local servers usually need no key.
    #[instrument(skip(api_key), fields(base_url = %base_url.as_ref(), model = %model.as_ref()))]
    pub fn new(
        base_url: impl AsRef<str>,
        model: impl AsRef<str>,
        api_key: Option<String>,
    ) -> ScriptoriumResult<Self> {
        Self::with_timeout(
            base_url,
            model,
            api_key,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Creates a client whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl AsRef<str>,
        model: impl AsRef<str>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> ScriptoriumResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CompletionError::new(CompletionErrorKind::Http(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;

        debug!("Created OpenAI-compatible client");

        Ok(Self {
            client,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            model: model.as_ref().to_string(),
            api_key,
            timeout,
        })
    }

    /// Creates a client reading the API key from `api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionErrorKind::MissingApiKey`] if the variable is unset.
    pub fn from_env(
        base_url: impl AsRef<str>,
        model: impl AsRef<str>,
        api_key_env: &str,
    ) -> ScriptoriumResult<Self> {
        let api_key = std::env::var(api_key_env).map_err(|_| {
            CompletionError::new(CompletionErrorKind::MissingApiKey(api_key_env.to_string()))
        })?;
        Self::new(base_url, model, Some(api_key))
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(&self, body: &crate::openai::ChatRequest) -> ScriptoriumResult<reqwest::Response> {
        let mut req = self.client.post(self.endpoint()).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(error = ?e, "HTTP request failed");
            self.transport_error(&e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        error!(status = %status, error = %message, "API error");
        let kind = if status.as_u16() == 429 {
            CompletionErrorKind::RateLimited(message)
        } else {
            CompletionErrorKind::ApiError {
                status_code: status.as_u16(),
                message,
            }
        };
        Err(CompletionError::new(kind).into())
    }

    fn transport_error(&self, e: &reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::new(CompletionErrorKind::Timeout(self.timeout.as_millis() as u64))
        } else {
            CompletionError::new(CompletionErrorKind::Http(e.to_string()))
        }
    }
}

#[async_trait]
impl CompletionDriver for OpenAiCompatClient {
    #[instrument(skip(self, req), fields(model = %self.model))]
    async fn generate(&self, req: &GenerateRequest) -> ScriptoriumResult<GenerateResponse> {
        let body = conversion::to_chat_request(req, &self.model, false)?;
        let response = self.send(&body).await?;

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse response");
            CompletionError::new(CompletionErrorKind::MalformedResponse(e.to_string()))
        })?;

        conversion::from_chat_response(&parsed)
    }

    #[instrument(skip(self, req), fields(model = %self.model))]
    async fn generate_stream(&self, req: &GenerateRequest) -> ScriptoriumResult<ChunkStream> {
        let body = conversion::to_chat_request(req, &self.model, true)?;
        let response = self.send(&body).await?;
        let timeout_ms = self.timeout.as_millis() as u64;

        let stream: ChunkStream = Box::pin(async_stream::try_stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::default();
            let mut pending: Vec<u8> = Vec::new();
            let mut done = false;

            while let Some(next) = bytes.next().await {
                let data = next.map_err(|e| {
                    if e.is_timeout() {
                        CompletionError::new(CompletionErrorKind::Timeout(timeout_ms))
                    } else {
                        CompletionError::new(CompletionErrorKind::StreamInterrupted(e.to_string()))
                    }
                })?;
                pending.extend_from_slice(&data);
                // Multibyte characters may straddle network chunks.
                let valid = match std::str::from_utf8(&pending) {
                    Ok(text) => text.len(),
                    Err(e) => e.valid_up_to(),
                };
                let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
                pending.drain(..valid);

                for payload in decoder.push(&text) {
                    if payload == SseDecoder::DONE {
                        done = true;
                        break;
                    }
                    let chunk: ChatChunk = serde_json::from_str(&payload).map_err(|e| {
                        CompletionError::new(CompletionErrorKind::MalformedResponse(format!(
                            "Failed to parse chunk: {}",
                            e
                        )))
                    })?;
                    yield conversion::to_stream_chunk(&chunk)?;
                }
                if done {
                    break;
                }
            }

            if !done {
                match decoder.finish() {
                    Some(payload) if payload == SseDecoder::DONE => {}
                    Some(payload) => {
                        warn!("Stream ended without [DONE]");
                        let chunk: ChatChunk = serde_json::from_str(&payload).map_err(|e| {
                            CompletionError::new(CompletionErrorKind::StreamInterrupted(format!(
                                "Truncated final chunk: {}",
                                e
                            )))
                        })?;
                        yield conversion::to_stream_chunk(&chunk)?;
                    }
                    None => debug!("Stream closed without [DONE]"),
                }
            }
        });

        Ok(stream)
    }

    fn provider_name(&self) -> &'static str {
        "openai_compat"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
