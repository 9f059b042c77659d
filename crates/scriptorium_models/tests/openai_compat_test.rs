mod test_utils;

use futures_util::StreamExt;
use scriptorium_error::{CompletionErrorKind, ScriptoriumErrorKind};
use scriptorium_interface::CompletionDriver;
use scriptorium_models::OpenAiCompatClient;
use test_utils::{create_test_request, serve_once};

#[tokio::test]
async fn test_generate_returns_text_and_usage() -> Result<(), Box<dyn std::error::Error>> {
    let body = r#"{"choices":[{"message":{"role":"assistant","content":"The tide came in."},"finish_reason":"stop"}],"usage":{"prompt_tokens":12,"completion_tokens":5}}"#;
    let (base_url, server) = serve_once("200 OK", "application/json", body.to_string()).await;

    let client = OpenAiCompatClient::new(&base_url, "test-model", Some("sk-test".into()))?;
    let response = client.generate(&create_test_request("Begin.")).await?;

    assert_eq!(response.text, "The tide came in.");
    let usage = response.usage.expect("usage reported");
    assert_eq!(*usage.input_tokens(), 12);
    assert_eq!(*usage.output_tokens(), 5);

    let sent = server.await?;
    assert!(sent.contains("\"model\":\"test-model\""));
    assert!(sent.contains("\"stream\":false"));
    Ok(())
}

#[tokio::test]
async fn test_stream_yields_chunks_then_usage() -> Result<(), Box<dyn std::error::Error>> {
    let body = [
        r#"data: {"choices":[{"delta":{"content":"Salt "}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"and rope."},"finish_reason":"stop"}]}"#,
        r#"data: {"choices":[],"usage":{"prompt_tokens":8,"completion_tokens":4}}"#,
        "data: [DONE]",
    ]
    .iter()
    .map(|line| format!("{}\n\n", line))
    .collect::<String>();
    let (base_url, server) = serve_once("200 OK", "text/event-stream", body).await;

    let client = OpenAiCompatClient::new(&base_url, "test-model", None)?;
    let mut stream = client.generate_stream(&create_test_request("Go.")).await?;

    let mut text = String::new();
    let mut usage = None;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        text.push_str(chunk.text());
        if let Some(u) = chunk.usage() {
            usage = Some(*u);
        }
    }

    assert_eq!(text, "Salt and rope.");
    assert_eq!(usage.map(|u| u.total()), Some(12));
    assert!(server.await?.contains("include_usage"));
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_status_maps_to_rate_limited() -> Result<(), Box<dyn std::error::Error>> {
    let (base_url, _server) =
        serve_once("429 Too Many Requests", "text/plain", "slow down".to_string()).await;

    let client = OpenAiCompatClient::new(&base_url, "test-model", None)?;
    let err = client
        .generate(&create_test_request("Go."))
        .await
        .expect_err("429 must fail");

    match err.kind() {
        ScriptoriumErrorKind::Completion(e) => {
            assert!(matches!(e.kind, CompletionErrorKind::RateLimited(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_server_error_is_api_error() -> Result<(), Box<dyn std::error::Error>> {
    let (base_url, _server) = serve_once(
        "500 Internal Server Error",
        "text/plain",
        "boom".to_string(),
    )
    .await;

    let client = OpenAiCompatClient::new(&base_url, "test-model", None)?;
    let err = client
        .generate(&create_test_request("Go."))
        .await
        .expect_err("500 must fail");

    let completion = err.as_completion().expect("completion error");
    assert_eq!(
        completion.kind,
        CompletionErrorKind::ApiError {
            status_code: 500,
            message: "boom".to_string()
        }
    );
    Ok(())
}

#[test]
fn test_missing_api_key_env() {
    let err = OpenAiCompatClient::from_env(
        "http://localhost:1/v1",
        "m",
        "SCRIPTORIUM_TEST_KEY_THAT_IS_NEVER_SET",
    )
    .expect_err("unset key must fail");
    assert!(format!("{}", err).contains("SCRIPTORIUM_TEST_KEY_THAT_IS_NEVER_SET"));
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
async fn test_openai_basic_generation() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let client =
        OpenAiCompatClient::from_env("https://api.openai.com/v1", "gpt-4o-mini", "OPENAI_API_KEY")?;
    let response = client.generate(&create_test_request("Say hello")).await?;

    assert!(!response.text.is_empty(), "Should receive non-empty response");
    Ok(())
}
