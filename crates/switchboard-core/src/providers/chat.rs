//! OpenAI-compatible chat adapter (Groq)

use super::openai_compat::{parse_embedding_response, run_completion};
use crate::client::{ApiClient, Capability, ClientCore};
use crate::clock::SharedClock;
use crate::config::ProviderConfig;
use crate::error::{ClientError, ClientResult};
use crate::messages::{
    EmbeddingRequest, EmbeddingResponse, Message, RequestEnvelope, ResponseEnvelope,
    estimate_tokens,
};
use crate::resilience::CallContext;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{instrument, warn};

pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text-v1.5";

const CAPABILITIES: &[Capability] = &[
    Capability::Completion,
    Capability::StructuredOutput,
    Capability::Tools,
    Capability::Embedding,
];

/// Chat completion and embeddings over an OpenAI-compatible API
#[derive(Debug)]
pub struct ChatAdapter {
    core: ClientCore,
    default_model: String,
}

impl ChatAdapter {
    pub fn new(config: &ProviderConfig, clock: SharedClock) -> ClientResult<Self> {
        let core = ClientCore::new(config, clock)?;
        let default_model = config
            .model()
            .ok_or_else(|| ClientError::configuration(&config.provider_id, "no default model"))?
            .to_string();
        Ok(Self {
            core,
            default_model,
        })
    }

    pub fn core(&self) -> &ClientCore {
        &self.core
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Ids of the models the account can use
    pub async fn list_models(&self, ctx: &CallContext) -> ClientResult<Vec<String>> {
        let raw = self.core.get_json("models", ctx).await?;
        let data = raw.get("data").and_then(Value::as_array).ok_or_else(|| {
            ClientError::response(self.core.provider_id(), "model list contains no data")
        })?;
        Ok(data
            .iter()
            .filter_map(|m| m.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Completion text for one prompt
    pub async fn simple_completion(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> ClientResult<String> {
        let response = self
            .create_completion(&RequestEnvelope::prompt(prompt, system_prompt))
            .await?;
        Ok(response.content)
    }

    /// Next assistant turn for an existing conversation
    pub async fn conversation_completion(&self, conversation: &[Message]) -> ClientResult<String> {
        let response = self
            .create_completion(&RequestEnvelope::new(conversation.to_vec()))
            .await?;
        Ok(response.content)
    }

    /// Approximate token count (about four characters per token)
    pub fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

#[async_trait]
impl ApiClient for ChatAdapter {
    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    #[instrument(skip(self, request), fields(provider = %self.core.provider_id()), level = "debug")]
    async fn create_completion(&self, request: &RequestEnvelope) -> ClientResult<ResponseEnvelope> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        run_completion(&self.core, "chat/completions", request, Some(model), false).await
    }

    async fn create_embedding(&self, request: &EmbeddingRequest) -> ClientResult<EmbeddingResponse> {
        request.validate(self.core.provider_id())?;
        let mut body = json!({
            "input": request.input,
            "model": request.model.as_deref().unwrap_or(DEFAULT_EMBEDDING_MODEL),
            "encoding_format": "float",
        });
        if let Some(dimensions) = request.dimensions {
            body["dimensions"] = json!(dimensions);
        }
        let raw = self.core.post_json("embeddings", &body, &request.context).await?;
        parse_embedding_response(self.core.provider_id(), raw)
    }

    async fn test_connection(&self) -> bool {
        match self.core.get_json("models", &CallContext::new()).await {
            Ok(raw) => raw.get("data").is_some(),
            Err(e) => {
                warn!(provider = %self.core.provider_id(), error = %e, "connection test failed");
                false
            }
        }
    }

    async fn close(&self) -> ClientResult<()> {
        self.core.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}
