//! HTTP core shared by every adapter

use super::http::{MAX_HEADER_DELAY, classify_status, parse_rate_limit_reset, parse_retry_after};
use crate::clock::SharedClock;
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{ClientError, ClientResult};
use crate::resilience::{CallContext, RateLimiter, RetryPolicy};
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection pool, credential, rate limiter and retry policy of one
/// provider instance.
///
/// Every request acquires rate-limiter capacity once per attempt, inside
/// the retry loop, so retries are throttled like first attempts.
pub struct ClientCore {
    provider_id: String,
    kind: ProviderKind,
    base_url: String,
    auth_header: (HeaderName, HeaderValue),
    http: RwLock<Option<Client>>,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
    clock: SharedClock,
    timeout: Duration,
}

impl ClientCore {
    /// Validate `config` and open a connection pool.
    ///
    /// Fails with a configuration error when the credential is missing, so a
    /// live client never exists without one.
    pub fn new(config: &ProviderConfig, clock: SharedClock) -> ClientResult<Self> {
        config.validate()?;
        let provider_id = config.provider_id.clone();

        let auth_header = auth_header(config)?;
        let http = Client::builder()
            .connect_timeout(config.timeout.min(MAX_CONNECT_TIMEOUT))
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ClientError::configuration(&provider_id, format!("failed to build HTTP client: {e}"))
            })?;

        debug!(
            provider = %provider_id,
            kind = %config.kind,
            rate_limit_calls = config.rate_limit_calls,
            max_retries = config.max_retries,
            "client core initialized"
        );

        Ok(Self {
            kind: config.kind,
            base_url: config.base_url()?,
            auth_header,
            http: RwLock::new(Some(http)),
            rate_limiter: RateLimiter::with_clock(
                provider_id.clone(),
                config.rate_limit_config(),
                clock.clone(),
            ),
            retry: RetryPolicy::with_clock(provider_id.clone(), config.retry_config(), clock.clone()),
            clock,
            timeout: config.timeout,
            provider_id,
        })
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Absolute URL for `path` relative to the base URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json(&self, path: &str, ctx: &CallContext) -> ClientResult<Value> {
        self.request_json(Method::GET, path, None, ctx).await
    }

    pub async fn post_json(&self, path: &str, body: &Value, ctx: &CallContext) -> ClientResult<Value> {
        self.request_json(Method::POST, path, Some(body), ctx).await
    }

    /// Send one logical request: rate-limited, retried on transient
    /// failure, decoded as JSON.
    #[instrument(skip(self, body, ctx), fields(provider = %self.provider_id), level = "debug")]
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        ctx: &CallContext,
    ) -> ClientResult<Value> {
        let http = self.http_client()?;
        let url = self.url(path);

        self.retry
            .execute(ctx, |attempt| {
                let http = http.clone();
                let method = method.clone();
                let url = url.as_str();
                async move {
                    if self.is_closed() {
                        return Err(ClientError::closed(&self.provider_id));
                    }
                    self.rate_limiter.acquire_with(ctx).await?;
                    self.send_once(&http, method, url, body, attempt).await
                }
            })
            .await
    }

    async fn send_once(
        &self,
        http: &Client,
        method: Method,
        url: &str,
        body: Option<&Value>,
        attempt: u32,
    ) -> ClientResult<Value> {
        let (name, value) = &self.auth_header;
        let mut request = http.request(method, url).header(name, value);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        debug!(provider = %self.provider_id, attempt, status = status.as_u16(), "response received");

        self.observe_rate_limit_headers(response.headers());

        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(
                &self.provider_id,
                status.as_u16(),
                &text,
                retry_after,
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::response(&self.provider_id, format!("response is not valid JSON: {e}"))
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> ClientError {
        if error.is_builder() {
            return ClientError::invalid_request(&self.provider_id, error.to_string());
        }
        let message = if error.is_timeout() {
            format!("request timed out after {:?}", self.timeout)
        } else if error.is_connect() {
            format!("connection failed: {error}")
        } else {
            format!("request failed: {error}")
        };
        ClientError::transient(&self.provider_id, message)
    }

    fn observe_rate_limit_headers(&self, headers: &HeaderMap) {
        if let Some(reset) = parse_rate_limit_reset(headers) {
            let reset = reset.min(MAX_HEADER_DELAY);
            debug!(
                provider = %self.provider_id,
                reset_ms = reset.as_millis() as u64,
                "provider quota exhausted"
            );
            self.rate_limiter.defer_until(self.clock.now() + reset);
        }
    }

    fn http_client(&self) -> ClientResult<Client> {
        self.http
            .read()
            .clone()
            .ok_or_else(|| ClientError::closed(&self.provider_id))
    }

    /// Drop the connection pool. Later calls fail with `Closed`.
    pub fn close(&self) {
        if self.http.write().take().is_some() {
            debug!(provider = %self.provider_id, "client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.http.read().is_none()
    }
}

fn auth_header(config: &ProviderConfig) -> ClientResult<(HeaderName, HeaderValue)> {
    let (name, raw) = match (config.kind, config.api_key.as_deref()) {
        (ProviderKind::AzureOpenai, Some(key)) if !key.trim().is_empty() => {
            (HeaderName::from_static("api-key"), key.trim().to_string())
        }
        _ => {
            let token = config.credential().ok_or_else(|| {
                ClientError::configuration(&config.provider_id, "missing credential")
            })?;
            (AUTHORIZATION, format!("Bearer {}", token.trim()))
        }
    };

    let mut value = HeaderValue::from_str(&raw).map_err(|_| {
        ClientError::configuration(&config.provider_id, "credential contains invalid characters")
    })?;
    value.set_sensitive(true);
    Ok((name, value))
}

impl std::fmt::Debug for ClientCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCore")
            .field("provider_id", &self.provider_id)
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("closed", &self.is_closed())
            .field("rate_limiter", &self.rate_limiter)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
