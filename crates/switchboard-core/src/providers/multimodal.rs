//! Deployment-scoped multimodal adapter (Azure OpenAI)

use super::openai_compat::{parse_embedding_response, parse_image_response, run_completion};
use crate::client::{ApiClient, Capability, ClientCore};
use crate::clock::SharedClock;
use crate::config::{ProviderConfig, is_url_safe_name};
use crate::error::{ClientError, ClientResult};
use crate::messages::{
    EmbeddingRequest, EmbeddingResponse, ImageAnalysisRequest, ImageRequest, ImageResponse,
    Message, RequestEnvelope, ResponseEnvelope,
};
use crate::resilience::CallContext;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

const CAPABILITIES: &[Capability] = &[
    Capability::Completion,
    Capability::StructuredOutput,
    Capability::Tools,
    Capability::Embedding,
    Capability::ImageGeneration,
    Capability::ImageAnalysis,
];

const JSON_ONLY_INSTRUCTION: &str = "You must respond with valid JSON only.";

/// Chat, embeddings, image generation and vision on named deployments.
///
/// `RequestEnvelope::model` and `EmbeddingRequest::model` select a
/// deployment other than the configured one.
#[derive(Debug)]
pub struct MultimodalAdapter {
    core: ClientCore,
    deployment: Option<String>,
    api_version: String,
}

impl MultimodalAdapter {
    pub fn new(config: &ProviderConfig, clock: SharedClock) -> ClientResult<Self> {
        Ok(Self {
            core: ClientCore::new(config, clock)?,
            deployment: config
                .deployment
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            api_version: config.api_version.clone(),
        })
    }

    pub fn core(&self) -> &ClientCore {
        &self.core
    }

    pub fn deployment(&self) -> Option<&str> {
        self.deployment.as_deref()
    }

    fn resolve_deployment<'a>(&'a self, deployment: Option<&'a str>) -> ClientResult<&'a str> {
        let deployment = deployment
            .or(self.deployment.as_deref())
            .ok_or_else(|| {
                ClientError::invalid_request(
                    self.core.provider_id(),
                    "deployment name must be specified",
                )
            })?;
        if !is_url_safe_name(deployment) {
            return Err(ClientError::invalid_request(
                self.core.provider_id(),
                format!("invalid deployment name '{deployment}'"),
            ));
        }
        Ok(deployment)
    }

    /// `openai/deployments/{deployment}/{operation}?api-version=...`
    fn operation_path(&self, deployment: Option<&str>, operation: &str) -> ClientResult<String> {
        let deployment = self.resolve_deployment(deployment)?;
        Ok(format!(
            "openai/deployments/{deployment}/{operation}?api-version={}",
            self.api_version
        ))
    }

    /// Metadata of a deployment, or of the configured one
    pub async fn get_deployment_details(
        &self,
        deployment: Option<&str>,
        ctx: &CallContext,
    ) -> ClientResult<Value> {
        let deployment = self.resolve_deployment(deployment)?;
        let path = format!(
            "openai/deployments/{deployment}?api-version={}",
            self.api_version
        );
        self.core.get_json(&path, ctx).await
    }

    /// Embed `texts` in chunks of `batch_size`, preserving input order
    pub async fn batch_embeddings(
        &self,
        texts: &[String],
        batch_size: usize,
        deployment: Option<&str>,
        ctx: &CallContext,
    ) -> ClientResult<Vec<Vec<f32>>> {
        if batch_size == 0 {
            return Err(ClientError::invalid_request(
                self.core.provider_id(),
                "batch_size must be greater than zero",
            ));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for (batch_index, batch) in texts.chunks(batch_size).enumerate() {
            let mut request = EmbeddingRequest::new(batch.iter().cloned()).with_context(ctx.clone());
            request.model = deployment.map(str::to_string);
            let response = self.create_embedding(&request).await?;
            debug!(
                provider = %self.core.provider_id(),
                batch = batch_index,
                size = batch.len(),
                "embedding batch complete"
            );
            embeddings.extend(response.embeddings);
        }
        Ok(embeddings)
    }

    /// Completion forced into JSON mode, returning the parsed object.
    ///
    /// With a schema the object is also validated against it.
    pub async fn create_json_response(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        schema: Option<Value>,
        ctx: &CallContext,
    ) -> ClientResult<Value> {
        let system = match system_prompt {
            Some(system) => format!("{system}\n\n{JSON_ONLY_INSTRUCTION}"),
            None => JSON_ONLY_INSTRUCTION.to_string(),
        };
        let mut request = RequestEnvelope::prompt(prompt, Some(&system)).with_context(ctx.clone());
        request.response_schema = schema;

        let path = self.operation_path(None, "chat/completions")?;
        let response = run_completion(&self.core, &path, &request, None, true).await?;
        response.structured.ok_or_else(|| {
            ClientError::response(self.core.provider_id(), "response carried no JSON payload")
        })
    }

    /// Content policy check
    pub async fn moderate_content(
        &self,
        text: &str,
        deployment: Option<&str>,
        ctx: &CallContext,
    ) -> ClientResult<Value> {
        let path = self.operation_path(deployment, "moderations")?;
        self.core.post_json(&path, &json!({ "input": text }), ctx).await
    }
}

#[async_trait]
impl ApiClient for MultimodalAdapter {
    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    #[instrument(skip(self, request), fields(provider = %self.core.provider_id()), level = "debug")]
    async fn create_completion(&self, request: &RequestEnvelope) -> ClientResult<ResponseEnvelope> {
        let path = self.operation_path(request.model.as_deref(), "chat/completions")?;
        run_completion(&self.core, &path, request, None, false).await
    }

    async fn create_embedding(&self, request: &EmbeddingRequest) -> ClientResult<EmbeddingResponse> {
        request.validate(self.core.provider_id())?;
        let path = self.operation_path(request.model.as_deref(), "embeddings")?;
        let mut body = json!({
            "input": request.input,
            "encoding_format": "float",
        });
        if let Some(dimensions) = request.dimensions {
            body["dimensions"] = json!(dimensions);
        }
        let raw = self.core.post_json(&path, &body, &request.context).await?;
        parse_embedding_response(self.core.provider_id(), raw)
    }

    async fn create_image(&self, request: &ImageRequest) -> ClientResult<ImageResponse> {
        if request.prompt.trim().is_empty() {
            return Err(ClientError::invalid_request(
                self.core.provider_id(),
                "image prompt must not be empty",
            ));
        }
        let path = self.operation_path(None, "images/generations")?;
        let body = json!({
            "prompt": request.prompt,
            "n": request.n,
            "size": request.size,
            "quality": request.quality,
            "style": request.style,
            "response_format": request.response_format,
        });
        let raw = self.core.post_json(&path, &body, &request.context).await?;
        parse_image_response(self.core.provider_id(), raw)
    }

    async fn analyze_image(&self, request: &ImageAnalysisRequest) -> ClientResult<ResponseEnvelope> {
        let envelope = RequestEnvelope::new(vec![Message::user_with_image(
            request.prompt.clone(),
            request.image_url.clone(),
            Some(request.detail.clone()),
        )])
        .with_max_tokens(request.max_tokens)
        .with_context(request.context.clone());
        self.create_completion(&envelope).await
    }

    async fn test_connection(&self) -> bool {
        if self.deployment.is_none() {
            warn!(
                provider = %self.core.provider_id(),
                "no deployment configured, cannot test connection"
            );
            return false;
        }
        match self.get_deployment_details(None, &CallContext::new()).await {
            Ok(_) => true,
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
