//! Tests for the HTTP core and status mapping

use super::*;
use crate::clock::{ManualClock, SharedClock};
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ErrorKind;
use crate::resilience::CallContext;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn groq_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig::groq("gsk-test-key")
        .with_endpoint(server.uri())
        .with_max_retries(2)
        .with_retry_delay(Duration::from_millis(10))
        .with_timeout(Duration::from_secs(5))
}

fn core_with(config: &ProviderConfig) -> (ClientCore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let shared: SharedClock = clock.clone();
    (ClientCore::new(config, shared).unwrap(), clock)
}

#[test]
fn test_status_classification() {
    for status in [429u16, 500, 502, 503, 504] {
        assert_eq!(
            classify_status("groq", status, "", None).kind(),
            ErrorKind::TransientNetwork,
            "status {status}"
        );
    }
    for status in [400u16, 401, 403, 404, 422] {
        assert_eq!(
            classify_status("groq", status, "", None).kind(),
            ErrorKind::PermanentRequest,
            "status {status}"
        );
    }
}

#[test]
fn test_retry_after_header() {
    let mut headers = HeaderMap::new();
    assert_eq!(parse_retry_after(&headers), None);
    headers.insert("retry-after", HeaderValue::from_static("2"));
    assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(2)));
    headers.insert("retry-after", HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
    assert_eq!(parse_retry_after(&headers), None);

    headers.insert("retry-after", HeaderValue::from_static("1e30"));
    assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(3600)));
    headers.insert("retry-after", HeaderValue::from_static("-5"));
    assert_eq!(parse_retry_after(&headers), None);
}

#[test]
fn test_rate_limit_reset_headers() {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("3"));
    headers.insert("x-ratelimit-reset", HeaderValue::from_static("20"));
    assert_eq!(parse_rate_limit_reset(&headers), None);

    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
    assert_eq!(parse_rate_limit_reset(&headers), Some(Duration::from_secs(20)));

    headers.insert("x-ratelimit-reset", HeaderValue::from_static("7.5s"));
    assert_eq!(parse_rate_limit_reset(&headers), Some(Duration::from_millis(7500)));

    // Unix timestamp in the past
    headers.insert("x-ratelimit-reset", HeaderValue::from_static("1500000000"));
    assert_eq!(parse_rate_limit_reset(&headers), None);

    // Far-future timestamp is clamped rather than overflowing
    headers.insert("x-ratelimit-reset", HeaderValue::from_static("1e25"));
    assert_eq!(parse_rate_limit_reset(&headers), Some(Duration::from_secs(3600)));

    headers.insert("x-ratelimit-reset", HeaderValue::from_static("9999999"));
    assert_eq!(parse_rate_limit_reset(&headers), Some(Duration::from_secs(3600)));
}

#[test]
fn test_capability_display() {
    assert_eq!(Capability::ImageGeneration.to_string(), "image generation");
    assert_eq!(Capability::Embedding.to_string(), "embeddings");
}

#[tokio::test]
async fn test_missing_credential_never_builds_core() {
    let config = ProviderConfig::new("groq", ProviderKind::Groq);
    let err = ClientCore::new(&config, crate::clock::system_clock()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_azure_uses_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .and(header("api-key", "az-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::azure_openai("az-key", server.uri());
    let (core, _) = core_with(&config);
    let value = core.get_json("status", &CallContext::new()).await.unwrap();
    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn test_transient_status_is_retried_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
        .expect(1)
        .mount(&server)
        .await;

    let (core, clock) = core_with(&groq_config(&server));
    let value = core
        .post_json("chat/completions", &json!({"messages": []}), &CallContext::new())
        .await
        .unwrap();

    assert_eq!(value["id"], "x");
    assert_eq!(clock.sleeps().len(), 1);
}

#[tokio::test]
async fn test_permanent_status_makes_one_request_and_redacts_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API key: api_key=gsk-live-abcdef123456", "type": "auth"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (core, clock) = core_with(&groq_config(&server));
    let err = core
        .post_json("chat/completions", &json!({}), &CallContext::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermanentRequest);
    assert_eq!(err.status(), Some(401));
    assert!(!err.to_string().contains("gsk-live-abcdef123456"));
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_exhaustion_counts_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .expect(3)
        .mount(&server)
        .await;

    let (core, _) = core_with(&groq_config(&server));
    let err = core.get_json("models", &CallContext::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RetryExhausted);
    assert_eq!(err.attempts(), Some(3));
    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn test_oversized_header_delays_are_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1e30")
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "1e25"),
        )
        .expect(3)
        .mount(&server)
        .await;

    let (core, clock) = core_with(&groq_config(&server));
    let err = core.get_json("models", &CallContext::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RetryExhausted);
    assert_eq!(err.attempts(), Some(3));
    assert!(!clock.sleeps().is_empty());
    assert!(clock.sleeps().iter().all(|d| *d <= Duration::from_secs(3600)));
}

#[tokio::test]
async fn test_invalid_json_is_provider_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let (core, _) = core_with(&groq_config(&server));
    let err = core.get_json("models", &CallContext::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderResponse);
}

#[tokio::test]
async fn test_http_timeout_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = groq_config(&server)
        .with_max_retries(1)
        .with_timeout(Duration::from_millis(50));
    let (core, _) = core_with(&config);
    let err = core.get_json("models", &CallContext::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RetryExhausted);
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_every_attempt_consumes_rate_limit_capacity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = groq_config(&server).with_rate_limit(10, Duration::from_secs(3600));
    let (core, _) = core_with(&config);
    let _ = core.get_json("models", &CallContext::new()).await;

    assert_eq!(core.rate_limiter().available(), 7);
}

#[tokio::test]
async fn test_exhausted_quota_header_defers_next_grant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "30"),
        )
        .mount(&server)
        .await;

    let (core, clock) = core_with(&groq_config(&server));
    core.get_json("models", &CallContext::new()).await.unwrap();
    assert_eq!(core.rate_limiter().available(), 0);

    core.get_json("models", &CallContext::new()).await.unwrap();
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(30)]);
}

#[tokio::test]
async fn test_close_is_idempotent_and_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let (core, _) = core_with(&groq_config(&server));
    assert!(!core.is_closed());
    core.close();
    core.close();
    assert!(core.is_closed());

    let err = core.get_json("models", &CallContext::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
}

#[tokio::test]
async fn test_unreachable_host_is_transient() {
    let config = ProviderConfig::groq("gsk-test-key")
        .with_endpoint("http://127.0.0.1:1")
        .with_max_retries(0);
    let (core, _) = core_with(&config);
    let err = core.get_json("models", &CallContext::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RetryExhausted);
    assert_eq!(err.attempts(), Some(1));
}
