//! Ollama provider against a mock HTTP server.

use futures::TryStreamExt;
use serde_json::json;
use specify_providers::{default_registry, Provider, ProviderConfig, ProviderError};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ProviderConfig {
    ProviderConfig::builder("llama3.2")
        .base_url(server.uri())
        .timeout(5)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_generate_sends_messages_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "stream": false,
            "messages": [
                {"role": "system", "content": "Be concise."},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "Hi!"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = default_registry().create("ollama", config_for(&server)).unwrap();
    let text = provider.generate("Hello", "Be concise.").await.unwrap();
    assert_eq!(text, "Hi!");
}

#[tokio::test]
async fn test_generate_empty_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": ""},
            "done": true
        })))
        .mount(&server)
        .await;

    let provider = default_registry().create("ollama", config_for(&server)).unwrap();
    assert_eq!(provider.generate("Hello", "").await.unwrap(), "");
}

#[tokio::test]
async fn test_stream_yields_ndjson_chunks() {
    let server = MockServer::start().await;
    let body = [
        r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#,
        r#"{"message":{"role":"assistant","content":"lo"},"done":false}"#,
        r#"{"message":{"role":"assistant","content":""},"done":true}"#,
    ]
    .join("\n");
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let provider = default_registry().create("ollama", config_for(&server)).unwrap();
    let chunks: Vec<String> = provider.stream("Hello", "").try_collect().await.unwrap();
    assert_eq!(chunks, vec!["Hel", "lo"]);
}

#[tokio::test]
async fn test_stream_rejects_unterminated_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2 * 1024 * 1024)))
        .mount(&server)
        .await;

    let provider = default_registry().create("ollama", config_for(&server)).unwrap();
    let err = provider
        .stream("Hello", "")
        .try_collect::<Vec<String>>()
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Response(_)), "{err}");
    assert!(err.to_string().contains("record longer than"));
}

#[tokio::test]
async fn test_http_error_is_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "model 'nope' not found"})),
        )
        .mount(&server)
        .await;

    let provider = default_registry().create("ollama", config_for(&server)).unwrap();
    let err = provider.generate("Hello", "").await.unwrap_err();
    assert!(matches!(err, ProviderError::Response(_)), "{err}");
    assert!(err.to_string().contains("model 'nope' not found"));
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    // Nothing listens on port 9 (discard) in the test environment.
    let config = ProviderConfig::builder("llama3.2")
        .base_url("http://127.0.0.1:9")
        .timeout(2)
        .build()
        .unwrap();
    let provider = default_registry().create("ollama", config).unwrap();

    let err = provider.generate("Hello", "").await.unwrap_err();
    assert!(matches!(err, ProviderError::Connection(_)), "{err}");
    assert!(err.is_retryable());
    assert!(!provider.validate_connection().await);
}

#[tokio::test]
async fn test_validate_connection_lists_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3.2:latest"}, {"name": "mistral:7b"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = default_registry().create("ollama", config_for(&server)).unwrap();
    assert!(provider.validate_connection().await);
}
