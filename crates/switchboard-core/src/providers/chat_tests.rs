//! Chat adapter tests against a mock OpenAI-compatible server

use super::ChatAdapter;
use crate::client::{ApiClient, Capability};
use crate::clock::ManualClock;
use crate::config::ProviderConfig;
use crate::error::ErrorKind;
use crate::messages::{EmbeddingRequest, ImageRequest, Message, RequestEnvelope};
use crate::resilience::CallContext;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer) -> ChatAdapter {
    let config = ProviderConfig::groq("gsk-test")
        .with_endpoint(server.uri())
        .with_max_retries(1)
        .with_retry_delay(Duration::from_millis(5));
    ChatAdapter::new(&config, Arc::new(ManualClock::new())).unwrap()
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": "mixtral-8x7b-32768",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
    })
}

#[tokio::test]
async fn test_completion_sends_default_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk-test"))
        .and(body_partial_json(json!({
            "model": "mixtral-8x7b-32768",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let response = adapter(&server)
        .create_completion(&RequestEnvelope::prompt("Hello", None))
        .await
        .unwrap();

    assert_eq!(response.content, "Hi there");
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage.unwrap().total_tokens, 10);
    assert!(response.structured.is_none());
}

#[tokio::test]
async fn test_request_model_overrides_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "llama3-70b-8192"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let request = RequestEnvelope::prompt("Hello", None).with_model("llama3-70b-8192");
    adapter(&server).create_completion(&request).await.unwrap();
}

#[tokio::test]
async fn test_structured_output_is_parsed_and_validated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion(r#"{"city": "Oslo", "population": 709000}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let schema = json!({
        "type": "object",
        "properties": {"city": {"type": "string"}, "population": {"type": "integer"}},
        "required": ["city", "population"]
    });
    let response = adapter(&server)
        .create_completion(&RequestEnvelope::prompt("Capital of Norway?", None).with_response_schema(schema))
        .await
        .unwrap();

    assert_eq!(response.structured.unwrap()["city"], "Oslo");
}

#[tokio::test]
async fn test_schema_violation_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"city": 42}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let schema = json!({
        "type": "object",
        "properties": {"city": {"type": "string"}},
        "required": ["city"]
    });
    let err = adapter(&server)
        .create_completion(&RequestEnvelope::prompt("Capital?", None).with_response_schema(schema))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProviderResponse);
}

#[tokio::test]
async fn test_malformed_schema_fails_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let request = RequestEnvelope::prompt("hi", None)
        .with_response_schema(json!({"type": "object", "required": "name"}));
    let err = adapter(&server).create_completion(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn test_embeddings_use_default_embedding_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({
            "model": "nomic-embed-text-v1.5",
            "input": ["alpha", "beta"],
            "encoding_format": "float"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 0, "embedding": [0.1, 0.2]},
                {"index": 1, "embedding": [0.3, 0.4]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = adapter(&server)
        .create_embedding(&EmbeddingRequest::new(["alpha", "beta"]))
        .await
        .unwrap();
    assert_eq!(response.embeddings.len(), 2);
}

#[tokio::test]
async fn test_list_models_and_connection_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"id": "mixtral-8x7b-32768"}, {"id": "llama3-8b-8192"}]
        })))
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    assert_eq!(
        adapter.list_models(&CallContext::new()).await.unwrap(),
        vec!["mixtral-8x7b-32768", "llama3-8b-8192"]
    );
    assert!(adapter.test_connection().await);
}

#[tokio::test]
async fn test_connection_check_reports_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "bad key"}})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!adapter(&server).test_connection().await);
}

#[tokio::test]
async fn test_convenience_helpers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "content": "Answer in one word"},
                {"role": "user", "content": "Sky colour?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Blue")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello!"},
                {"role": "user", "content": "Bye"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Goodbye")))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    assert_eq!(
        adapter
            .simple_completion("Sky colour?", Some("Answer in one word"))
            .await
            .unwrap(),
        "Blue"
    );
    let conversation = [
        Message::user("Hi"),
        Message::assistant("Hello!"),
        Message::user("Bye"),
    ];
    assert_eq!(
        adapter.conversation_completion(&conversation).await.unwrap(),
        "Goodbye"
    );
    assert_eq!(adapter.count_tokens("twelve chars"), 3);
}

#[tokio::test]
async fn test_unsupported_operations_fail_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    assert!(!adapter.supports(Capability::ImageGeneration));

    let err = adapter
        .create_image(&ImageRequest::new("a red fox"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapabilityMismatch);

    let err = adapter
        .simple_search("rust news", &CallContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapabilityMismatch);
}

#[tokio::test]
async fn test_calls_after_close_fail_fast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("late")))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    adapter.close().await.unwrap();
    adapter.close().await.unwrap();
    assert!(adapter.is_closed());

    let err = adapter
        .create_completion(&RequestEnvelope::prompt("hi", None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
}

#[tokio::test]
async fn test_empty_request_is_rejected_locally() {
    let server = MockServer::start().await;
    let err = adapter(&server)
        .create_completion(&RequestEnvelope::new(vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert!(server.received_requests().await.unwrap().is_empty());
}
