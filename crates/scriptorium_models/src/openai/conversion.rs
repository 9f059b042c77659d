//! Conversion between Scriptorium and wire types.

use crate::openai::{ChatChunk, ChatMessage, ChatRequest, ChatResponse, ChatUsage};
use scriptorium_core::{GenerateRequest, GenerateResponse, Role, TokenUsage};
use scriptorium_error::{BuilderError, CompletionError, CompletionErrorKind, ScriptoriumResult};
use scriptorium_interface::{FinishReason, StreamChunk};

/// Builds the request body for a generate call.
#[tracing::instrument(skip(request), fields(messages = request.messages().len()))]
pub fn to_chat_request(
    request: &GenerateRequest,
    default_model: &str,
    stream: bool,
) -> ScriptoriumResult<ChatRequest> {
    let messages = request
        .messages()
        .iter()
        .map(|m| ChatMessage {
            role: role_name(m.role).to_string(),
            content: m.content.clone(),
        })
        .collect::<Vec<_>>();

    let model = request
        .model()
        .clone()
        .unwrap_or_else(|| default_model.to_string());

    let stream_options = stream.then(|| serde_json::json!({ "include_usage": true }));

    ChatRequest::builder()
        .model(model)
        .messages(messages)
        .max_tokens(*request.max_tokens())
        .temperature(*request.temperature())
        .stream(stream)
        .stream_options(stream_options)
        .build()
        .map_err(|e| {
            CompletionError::new(CompletionErrorKind::MalformedResponse(format!(
                "Failed to build request: {}",
                e
            )))
            .into()
        })
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Converts wire usage into core usage.
pub fn to_usage(usage: &ChatUsage) -> TokenUsage {
    TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
}

/// Extracts text and usage from a non-streaming response.
///
/// A response without choices is an error, not an empty success.
pub fn from_chat_response(response: &ChatResponse) -> ScriptoriumResult<GenerateResponse> {
    let choice = response.choices.first().ok_or_else(|| {
        CompletionError::new(CompletionErrorKind::MalformedResponse(
            "No choices in response".to_string(),
        ))
    })?;

    Ok(GenerateResponse::new(
        choice.message.content.clone(),
        response.usage.as_ref().map(to_usage),
    ))
}

/// Converts one streamed chunk.
///
/// Usage-only trailing chunks become empty final chunks carrying the usage.
pub fn to_stream_chunk(chunk: &ChatChunk) -> ScriptoriumResult<StreamChunk> {
    let usage = chunk.usage.as_ref().map(to_usage);
    let Some(choice) = chunk.choices.first() else {
        return Ok(StreamChunk::last(String::new(), usage));
    };

    let finish_reason = choice
        .finish_reason
        .as_deref()
        .map(FinishReason::from_provider);
    StreamChunk::builder()
        .text(choice.delta.content.clone().unwrap_or_default())
        .is_final(finish_reason.is_some())
        .finish_reason(finish_reason)
        .usage(usage)
        .build()
        .map_err(|e| BuilderError::from(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::Message;

    #[test]
    fn test_request_uses_default_model_and_roles() {
        let request = GenerateRequest::builder()
            .messages(vec![Message::system("be terse"), Message::user("hi")])
            .max_tokens(Some(64))
            .build()
            .unwrap();
        let body = to_chat_request(&request, "local-model", true).unwrap();
        assert_eq!(body.model(), "local-model");
        assert_eq!(body.messages()[0].role, "system");
        assert_eq!(body.messages()[1].role, "user");
        assert!(*body.stream());
        assert_eq!(*body.max_tokens(), Some(64));
        assert!(body.stream_options().is_some());
    }

    #[test]
    fn test_empty_choices_is_error() {
        let response = ChatResponse {
            choices: vec![],
            usage: None,
        };
        assert!(from_chat_response(&response).is_err());
    }

    #[test]
    fn test_usage_only_chunk_is_final() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":3}}"#,
        )
        .unwrap();
        let converted = to_stream_chunk(&chunk).unwrap();
        assert!(*converted.is_final());
        assert_eq!(converted.usage().map(|u| u.total()), Some(13));
    }
}
