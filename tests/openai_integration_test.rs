//! Wiremock integration tests for OpenAiCompatClient.
//!
//! These tests verify correct HTTP interaction and error handling using mocked responses.

use std::sync::Arc;
use std::time::Duration;

use huginn::providers::OpenAiCompatClient;
use huginn::{
    Embedder, FinishReason, GenerateOptions, GenerationBackend, Huginn, HuginnError, Message,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "model": "gemini-2.5-flash",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13 }
    })
}

// ============================================================================
// Chat completions
// ============================================================================

/// Test successful chat completion request.
#[tokio::test]
async fn test_generate_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test_key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gemini-2.5-flash",
            "max_tokens": 64,
            "messages": [{ "role": "user", "content": "What is 2+2?" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("4")))
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri())
        .unwrap()
        .api_key("test_key");
    let options = GenerateOptions::new("gemini-2.5-flash").max_tokens(64);
    let response = client
        .generate(&[Message::user("What is 2+2?")], &options)
        .await
        .expect("generate should succeed");

    assert_eq!(response.text, "4");
    assert_eq!(response.model.as_deref(), Some("gemini-2.5-flash"));
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert_eq!(response.usage.unwrap().total_tokens, 13);
}

/// Test that a truncated completion maps to `Length`.
#[tokio::test]
async fn test_generate_length_finish_reason() {
    let mock_server = MockServer::start().await;
    let mut body = chat_body("partial");
    body["choices"][0]["finish_reason"] = serde_json::json!("length");

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri()).unwrap();
    let response = client
        .generate(&[Message::user("hi")], &GenerateOptions::new("m"))
        .await
        .unwrap();
    assert_eq!(response.finish_reason, FinishReason::Length);
}

/// Test that empty choices are an error.
#[tokio::test]
async fn test_generate_empty_choices() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri()).unwrap();
    let result = client
        .generate(&[Message::user("hi")], &GenerateOptions::new("m"))
        .await;
    assert!(matches!(result, Err(HuginnError::EmptyResponse)));
}

/// Test 401 Unauthorized maps to AuthenticationFailed.
#[tokio::test]
async fn test_auth_error_401() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri())
        .unwrap()
        .api_key("bad_key");
    let result = client
        .generate(&[Message::user("hi")], &GenerateOptions::new("m"))
        .await;

    assert!(
        matches!(result, Err(HuginnError::AuthenticationFailed)),
        "expected AuthenticationFailed, got {:?}",
        result
    );
}

/// Test 429 Too Many Requests maps to RateLimited with retry-after.
#[tokio::test]
async fn test_rate_limit_429_with_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_string("Rate limit exceeded"),
        )
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri()).unwrap();
    let err = client
        .generate(&[Message::user("hi")], &GenerateOptions::new("m"))
        .await
        .unwrap_err();

    assert!(matches!(err, HuginnError::RateLimited { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    assert!(err.is_transient());
}

/// Test that a structured error body is unwrapped into the message.
#[tokio::test]
async fn test_server_error_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": { "message": "model overloaded", "type": "server_error" }
        })))
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri()).unwrap();
    let err = client
        .generate(&[Message::user("hi")], &GenerateOptions::new("m"))
        .await
        .unwrap_err();

    match &err {
        HuginnError::Api { status, message } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "model overloaded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(err.is_transient());
}

/// Test 400 with a plain body keeps the raw text.
#[tokio::test]
async fn test_client_error_raw_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri()).unwrap();
    let err = client
        .generate(&[Message::user("hi")], &GenerateOptions::new("m"))
        .await
        .unwrap_err();

    assert!(matches!(&err, HuginnError::Api { status: 400, message } if message == "bad request"));
    assert!(!err.is_transient());
}

// ============================================================================
// Embeddings
// ============================================================================

/// Test successful embedding request.
#[tokio::test]
async fn test_embed_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(serde_json::json!({
            "model": "text-embedding-3-small",
            "input": "hello world"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": [{ "object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3] }],
            "model": "text-embedding-3-small"
        })))
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri()).unwrap();
    let embedding = client.embed("hello world").await.expect("embed should succeed");

    assert_eq!(embedding.dimensions, 3);
    assert_eq!(embedding.model, "text-embedding-3-small");
    assert!((embedding.values[2] - 0.3).abs() < 0.001);
}

/// Test that a 5xx from the embeddings endpoint is reported as unavailable.
#[tokio::test]
async fn test_embed_server_error_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down for maintenance"))
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri()).unwrap();
    let err = client.embed("hello").await.unwrap_err();

    assert!(matches!(err, HuginnError::EmbeddingServiceUnavailable(_)));
}

/// Test that an empty embedding is an error.
#[tokio::test]
async fn test_embed_empty_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri()).unwrap();
    assert!(matches!(
        client.embed("hello").await,
        Err(HuginnError::EmptyResponse)
    ));
}

/// Test that input validation happens before any request.
#[tokio::test]
async fn test_embed_rejects_bad_input_locally() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = OpenAiCompatClient::new(mock_server.uri())
        .unwrap()
        .max_input_chars(10);
    assert!(matches!(
        client.embed("   ").await,
        Err(HuginnError::InvalidInput(_))
    ));
    assert!(matches!(
        client.embed("far more than ten characters").await,
        Err(HuginnError::InputTooLong { max: 10, .. })
    ));
}

/// Test that an unreachable embedder is reported as unavailable.
#[tokio::test]
async fn test_embed_connection_refused() {
    // Port 9 (discard) is almost never listening on test hosts.
    let client = OpenAiCompatClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2))
        .unwrap();
    assert!(matches!(
        client.embed("hello").await,
        Err(HuginnError::EmbeddingServiceUnavailable(_))
    ));
}

// ============================================================================
// Pipeline over HTTP
// ============================================================================

/// One client serves as both embedder and backend.
#[tokio::test]
async fn test_pipeline_with_remote_embedder_and_backend() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "embedding": [0.6, 0.8, 0.0] }]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("4")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Arc::new(OpenAiCompatClient::new(mock_server.uri()).unwrap());
    let pipeline = Huginn::builder()
        .backend(client.clone())
        .embedder(client)
        .build()
        .unwrap();

    let first = pipeline.process("What is 2+2?").await.unwrap();
    assert_eq!(first.content, "4");
    assert!(!first.is_cache_hit());

    // Every text embeds to the same vector, so any query now hits.
    let second = pipeline.process("what's two plus two").await.unwrap();
    assert!(second.is_cache_hit());
    assert_eq!(second.content, "4");
}

/// An embedder outage degrades to generation without caching.
#[tokio::test]
async fn test_pipeline_embedder_outage_fails_open() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("4")))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = Arc::new(OpenAiCompatClient::new(mock_server.uri()).unwrap());
    let pipeline = Huginn::builder()
        .backend(client.clone())
        .embedder(client)
        .build()
        .unwrap();

    for _ in 0..2 {
        let response = pipeline.process("What is 2+2?").await.unwrap();
        assert_eq!(response.content, "4");
        assert!(!response.is_cache_hit());
    }
    assert!(pipeline.cache().is_empty());
}
