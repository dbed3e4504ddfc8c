//! Capability contract shared by every provider adapter

use super::Capability;
use crate::error::{ClientError, ClientResult};
use crate::messages::{
    Citation, EmbeddingRequest, EmbeddingResponse, ImageAnalysisRequest, ImageRequest,
    ImageResponse, RequestEnvelope, ResearchReport, ResponseEnvelope,
};
use crate::resilience::CallContext;
use async_trait::async_trait;

/// Uniform interface over heterogeneous providers.
///
/// Optional operations default to [`ClientError::CapabilityMismatch`]
/// without touching the network.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Registry key of this client
    fn provider_id(&self) -> &str;

    /// Operations this adapter implements
    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Chat completion, optionally with structured output
    async fn create_completion(&self, request: &RequestEnvelope) -> ClientResult<ResponseEnvelope>;

    async fn create_embedding(&self, _request: &EmbeddingRequest) -> ClientResult<EmbeddingResponse> {
        Err(ClientError::capability_mismatch(
            self.provider_id(),
            Capability::Embedding,
        ))
    }

    /// Web search returning only the answer text
    async fn simple_search(&self, _query: &str, _ctx: &CallContext) -> ClientResult<String> {
        Err(ClientError::capability_mismatch(
            self.provider_id(),
            Capability::Search,
        ))
    }

    /// Research a topic, answering every sub-question in one call
    async fn research_topic(
        &self,
        _topic: &str,
        _questions: &[String],
        _ctx: &CallContext,
    ) -> ClientResult<ResearchReport> {
        Err(ClientError::capability_mismatch(
            self.provider_id(),
            Capability::Research,
        ))
    }

    /// Sources attached to a response produced by this adapter
    fn get_citations(&self, _response: &ResponseEnvelope) -> ClientResult<Vec<Citation>> {
        Err(ClientError::capability_mismatch(
            self.provider_id(),
            Capability::Citations,
        ))
    }

    async fn create_image(&self, _request: &ImageRequest) -> ClientResult<ImageResponse> {
        Err(ClientError::capability_mismatch(
            self.provider_id(),
            Capability::ImageGeneration,
        ))
    }

    async fn analyze_image(&self, _request: &ImageAnalysisRequest) -> ClientResult<ResponseEnvelope> {
        Err(ClientError::capability_mismatch(
            self.provider_id(),
            Capability::ImageAnalysis,
        ))
    }

    /// Cheap check of credentials and reachability. Never errors.
    async fn test_connection(&self) -> bool;

    /// Release the connection pool. Idempotent.
    async fn close(&self) -> ClientResult<()>;

    fn is_closed(&self) -> bool;
}
