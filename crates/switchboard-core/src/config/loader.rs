//! Manager configuration: environment and JSON file loaders

use super::provider::{ProviderConfig, ProviderKind};
use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const CONFIG_SOURCE: &str = "config";

/// Settings for every provider a manager may initialize
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl ManagerConfig {
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self { providers }
    }

    /// Add or replace the config for `provider.provider_id`
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers
            .retain(|p| p.provider_id != provider.provider_id);
        self.providers.push(provider);
        self
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.provider_id == provider_id)
    }

    pub fn provider_ids(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.provider_id.as_str())
    }

    /// Load the three built-in providers from process environment variables
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the three built-in providers through an arbitrary variable lookup.
    ///
    /// Every provider is emitted even when its credential is missing; the
    /// manager reports that at initialization. Shared settings:
    /// `DEFAULT_TIMEOUT`, `MAX_RETRIES`, `RETRY_DELAY`, `RATE_LIMIT_CALLS`,
    /// `RATE_LIMIT_PERIOD` (durations in whole seconds).
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = Duration::from_secs(parse_var(&var, "DEFAULT_TIMEOUT", 30)?);
        let max_retries: u32 = parse_var(&var, "MAX_RETRIES", 3)?;
        let retry_delay = Duration::from_secs(parse_var(&var, "RETRY_DELAY", 1)?);
        let rate_limit_calls: u32 = parse_var(&var, "RATE_LIMIT_CALLS", 60)?;
        let rate_limit_period = Duration::from_secs(parse_var(&var, "RATE_LIMIT_PERIOD", 60)?);

        let shared = |config: ProviderConfig| {
            let config = config
                .with_timeout(timeout)
                .with_max_retries(max_retries)
                .with_retry_delay(retry_delay)
                .with_rate_limit(rate_limit_calls, rate_limit_period);
            // Keep the cap valid when RETRY_DELAY is large
            let max_delay = config.max_retry_delay.max(retry_delay);
            config.with_max_retry_delay(max_delay)
        };

        let mut groq = ProviderConfig::new("groq", ProviderKind::Groq);
        groq.api_key = var("GROQ_API_KEY");
        groq.endpoint = var("GROQ_BASE_URL");
        groq.default_model = var("GROQ_DEFAULT_MODEL");

        let mut perplexity = ProviderConfig::new("perplexity", ProviderKind::Perplexity);
        perplexity.api_key = var("PERPLEXITY_API_KEY");
        perplexity.endpoint = var("PERPLEXITY_BASE_URL");
        perplexity.default_model = var("PERPLEXITY_DEFAULT_MODEL");

        let mut azure = ProviderConfig::new("azure_openai", ProviderKind::AzureOpenai);
        azure.api_key = var("AZURE_OPENAI_API_KEY");
        azure.azure_ad_token = var("AZURE_AD_TOKEN");
        azure.endpoint = var("AZURE_OPENAI_ENDPOINT");
        azure.deployment = var("AZURE_OPENAI_DEPLOYMENT_NAME");
        if let Some(version) = var("AZURE_OPENAI_API_VERSION") {
            azure.api_version = version;
        }

        let config = Self::new(vec![shared(groq), shared(perplexity), shared(azure)]);
        debug!(
            configured = config.providers.iter().filter(|p| p.credential().is_some()).count(),
            "loaded provider configuration from environment"
        );
        Ok(config)
    }

    /// Read a JSON config file
    pub fn load_from_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ClientError::configuration(
                CONFIG_SOURCE,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            ClientError::configuration(
                CONFIG_SOURCE,
                format!("failed to parse {}: {e}", path.display()),
            )
        })?;
        debug!(path = %path.display(), providers = config.providers.len(), "loaded config file");
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> ClientResult<()> {
        let path = path.as_ref();
        let write_error = |e: std::io::Error| {
            ClientError::configuration(
                CONFIG_SOURCE,
                format!("failed to write {}: {e}", path.display()),
            )
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            ClientError::configuration(CONFIG_SOURCE, format!("failed to serialize config: {e}"))
        })?;
        fs::write(path, content).map_err(write_error)?;
        debug!(path = %path.display(), "saved config file");
        Ok(())
    }
}

fn parse_var<T, F>(var: &F, name: &str, default: T) -> ClientResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw.parse().map_err(|e| {
            ClientError::configuration(CONFIG_SOURCE, format!("invalid {name} value '{raw}': {e}"))
        }),
        None => Ok(default),
    }
}
