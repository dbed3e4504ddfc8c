//! Per-provider settings

use crate::error::{ClientError, ClientResult};
use crate::resilience::{BackoffConfig, RateLimitConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Upper bound on `max_retry_delay`
pub const MAX_RETRY_DELAY_LIMIT: Duration = Duration::from_secs(3600);

/// Which adapter serves a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible chat and embeddings
    Groq,
    /// Search-augmented chat with citations
    Perplexity,
    /// Chat, embeddings, image generation and vision on Azure deployments
    AzureOpenai,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Perplexity => "perplexity",
            ProviderKind::AzureOpenai => "azure_openai",
        }
    }

    /// Public endpoint used when the config names none
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Groq => Some("https://api.groq.com/openai/v1"),
            ProviderKind::Perplexity => Some("https://api.perplexity.ai"),
            ProviderKind::AzureOpenai => None,
        }
    }

    /// Model used when the request and the config name none
    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Groq => Some("mixtral-8x7b-32768"),
            ProviderKind::Perplexity => Some("sonar-medium-online"),
            ProviderKind::AzureOpenai => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "perplexity" => Ok(ProviderKind::Perplexity),
            "azure_openai" | "azure" => Ok(ProviderKind::AzureOpenai),
            other => Err(format!("unknown provider kind '{other}'")),
        }
    }
}

fn default_api_version() -> String {
    DEFAULT_AZURE_API_VERSION.to_string()
}

fn default_rate_limit_calls() -> u32 {
    60
}

fn default_rate_limit_period() -> Duration {
    Duration::from_secs(60)
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_retry_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_jitter_ratio() -> f64 {
    0.2
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Immutable settings for one provider
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Registry key, unique within a manager
    pub provider_id: String,
    pub kind: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Azure Active Directory token, accepted instead of `api_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_ad_token: Option<String>,
    /// Base URL; defaults per kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Azure deployment name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default = "default_rate_limit_calls")]
    pub rate_limit_calls: u32,
    #[serde(default = "default_rate_limit_period", with = "humantime_serde")]
    pub rate_limit_period: Duration,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay", with = "humantime_serde")]
    pub retry_base_delay: Duration,
    #[serde(default = "default_max_retry_delay", with = "humantime_serde")]
    pub max_retry_delay: Duration,
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(provider_id: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            provider_id: provider_id.into(),
            kind,
            api_key: None,
            azure_ad_token: None,
            endpoint: None,
            deployment: None,
            api_version: default_api_version(),
            default_model: None,
            rate_limit_calls: default_rate_limit_calls(),
            rate_limit_period: default_rate_limit_period(),
            max_retries: default_max_retries(),
            retry_base_delay: default_retry_base_delay(),
            max_retry_delay: default_max_retry_delay(),
            jitter_ratio: default_jitter_ratio(),
            timeout: default_timeout(),
        }
    }

    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new("groq", ProviderKind::Groq).with_api_key(api_key)
    }

    pub fn perplexity(api_key: impl Into<String>) -> Self {
        Self::new("perplexity", ProviderKind::Perplexity).with_api_key(api_key)
    }

    pub fn azure_openai(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new("azure_openai", ProviderKind::AzureOpenai)
            .with_api_key(api_key)
            .with_endpoint(endpoint)
    }

    /// Set API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set Azure AD token
    pub fn with_azure_ad_token(mut self, token: impl Into<String>) -> Self {
        self.azure_ad_token = Some(token.into());
        self
    }

    /// Set base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Allow `calls` requests per trailing `period`
    pub fn with_rate_limit(mut self, calls: u32, period: Duration) -> Self {
        self.rate_limit_calls = calls;
        self.rate_limit_period = period;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, base: Duration) -> Self {
        self.retry_base_delay = base;
        self
    }

    pub fn with_max_retry_delay(mut self, max: Duration) -> Self {
        self.max_retry_delay = max;
        self
    }

    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio;
        self
    }

    /// Per-request HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The credential used to authenticate, if any.
    ///
    /// Azure accepts an AD token when no API key is set.
    pub fn credential(&self) -> Option<&str> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }
        match self.kind {
            ProviderKind::AzureOpenai => {
                non_empty(&self.api_key).or_else(|| non_empty(&self.azure_ad_token))
            }
            _ => non_empty(&self.api_key),
        }
    }

    /// Effective base URL without a trailing slash
    pub fn base_url(&self) -> ClientResult<String> {
        let url = match (self.endpoint.as_deref(), self.kind.default_base_url()) {
            (Some(endpoint), _) if !endpoint.trim().is_empty() => endpoint.trim(),
            (_, Some(default)) => default,
            _ => {
                return Err(ClientError::configuration(
                    &self.provider_id,
                    format!("{} requires an endpoint", self.kind),
                ));
            }
        };
        Ok(url.trim_end_matches('/').to_string())
    }

    /// Effective default model, if the kind has one
    pub fn model(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .or_else(|| self.kind.default_model())
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.rate_limit_calls, self.rate_limit_period)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.max_retries,
            BackoffConfig::new(self.retry_base_delay, self.max_retry_delay)
                .with_jitter_ratio(self.jitter_ratio),
        )
    }

    /// Check every invariant a live client depends on
    pub fn validate(&self) -> ClientResult<()> {
        let fail = |message: String| Err(ClientError::configuration(&self.provider_id, message));

        if self.provider_id.trim().is_empty() {
            return fail("provider_id must not be empty".to_string());
        }
        if self.credential().is_none() {
            let expected = match self.kind {
                ProviderKind::AzureOpenai => "an api_key or azure_ad_token",
                _ => "an api_key",
            };
            return fail(format!("missing credential: {} requires {expected}", self.kind));
        }
        if self.rate_limit_calls == 0 {
            return fail("rate_limit_calls must be greater than zero".to_string());
        }
        if self.rate_limit_period.is_zero() {
            return fail("rate_limit_period must be greater than zero".to_string());
        }
        if self.retry_base_delay.is_zero() {
            return fail("retry_base_delay must be greater than zero".to_string());
        }
        if self.max_retry_delay < self.retry_base_delay {
            return fail("max_retry_delay must not be shorter than retry_base_delay".to_string());
        }
        if self.max_retry_delay > MAX_RETRY_DELAY_LIMIT {
            return fail(format!(
                "max_retry_delay must not exceed {}s",
                MAX_RETRY_DELAY_LIMIT.as_secs()
            ));
        }
        if !self.jitter_ratio.is_finite() || !(0.0..=1.0).contains(&self.jitter_ratio) {
            return fail(format!("jitter_ratio {} is outside 0.0..=1.0", self.jitter_ratio));
        }
        if self.timeout.is_zero() {
            return fail("timeout must be greater than zero".to_string());
        }

        if self.kind == ProviderKind::AzureOpenai {
            if let Some(deployment) = self.deployment.as_deref().map(str::trim) {
                if !deployment.is_empty() && !is_url_safe_name(deployment) {
                    return fail(format!("invalid deployment name '{deployment}'"));
                }
            }
            if !is_url_safe_name(&self.api_version) {
                return fail(format!("invalid api_version '{}'", self.api_version));
            }
        }

        let base_url = self.base_url()?;
        if let Err(e) = reqwest::Url::parse(&base_url) {
            return fail(format!("invalid endpoint '{base_url}': {e}"));
        }
        Ok(())
    }
}

/// Whether `name` can be placed in a URL path segment or query value as is.
///
/// Deployment names and API versions are restricted to ASCII letters,
/// digits, `-`, `_` and `.`.
pub fn is_url_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ProviderConfig")
            .field("provider_id", &self.provider_id)
            .field("kind", &self.kind)
            .field("api_key", &redact(&self.api_key))
            .field("azure_ad_token", &redact(&self.azure_ad_token))
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("default_model", &self.default_model)
            .field("rate_limit_calls", &self.rate_limit_calls)
            .field("rate_limit_period", &self.rate_limit_period)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("max_retry_delay", &self.max_retry_delay)
            .field("jitter_ratio", &self.jitter_ratio)
            .field("timeout", &self.timeout)
            .finish()
    }
}
