//! Provider adapter enum

use super::{ChatAdapter, MultimodalAdapter, SearchAdapter};
use crate::client::{ApiClient, Capability, ClientCore};
use crate::clock::SharedClock;
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ClientResult;
use crate::messages::{
    Citation, EmbeddingRequest, EmbeddingResponse, ImageAnalysisRequest, ImageRequest,
    ImageResponse, RequestEnvelope, ResearchReport, ResponseEnvelope,
};
use crate::resilience::CallContext;
use async_trait::async_trait;

/// One live provider client, selected by [`ProviderKind`]
#[derive(Debug)]
pub enum ClientInstance {
    Chat(ChatAdapter),
    Search(SearchAdapter),
    Multimodal(MultimodalAdapter),
}

impl ClientInstance {
    /// Build the adapter for `config.kind`
    pub fn from_config(config: &ProviderConfig, clock: SharedClock) -> ClientResult<Self> {
        Ok(match config.kind {
            ProviderKind::Groq => Self::Chat(ChatAdapter::new(config, clock)?),
            ProviderKind::Perplexity => Self::Search(SearchAdapter::new(config, clock)?),
            ProviderKind::AzureOpenai => Self::Multimodal(MultimodalAdapter::new(config, clock)?),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.core().kind()
    }

    pub fn core(&self) -> &ClientCore {
        match self {
            Self::Chat(a) => a.core(),
            Self::Search(a) => a.core(),
            Self::Multimodal(a) => a.core(),
        }
    }

    pub fn as_chat(&self) -> Option<&ChatAdapter> {
        match self {
            Self::Chat(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_search(&self) -> Option<&SearchAdapter> {
        match self {
            Self::Search(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_multimodal(&self) -> Option<&MultimodalAdapter> {
        match self {
            Self::Multimodal(a) => Some(a),
            _ => None,
        }
    }
}

#[async_trait]
impl ApiClient for ClientInstance {
    fn provider_id(&self) -> &str {
        match self {
            Self::Chat(a) => a.provider_id(),
            Self::Search(a) => a.provider_id(),
            Self::Multimodal(a) => a.provider_id(),
        }
    }

    fn capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Chat(a) => a.capabilities(),
            Self::Search(a) => a.capabilities(),
            Self::Multimodal(a) => a.capabilities(),
        }
    }

    async fn create_completion(&self, request: &RequestEnvelope) -> ClientResult<ResponseEnvelope> {
        match self {
            Self::Chat(a) => a.create_completion(request).await,
            Self::Search(a) => a.create_completion(request).await,
            Self::Multimodal(a) => a.create_completion(request).await,
        }
    }

    async fn create_embedding(&self, request: &EmbeddingRequest) -> ClientResult<EmbeddingResponse> {
        match self {
            Self::Chat(a) => a.create_embedding(request).await,
            Self::Search(a) => a.create_embedding(request).await,
            Self::Multimodal(a) => a.create_embedding(request).await,
        }
    }

    async fn simple_search(&self, query: &str, ctx: &CallContext) -> ClientResult<String> {
        match self {
            Self::Chat(a) => a.simple_search(query, ctx).await,
            Self::Search(a) => a.simple_search(query, ctx).await,
            Self::Multimodal(a) => a.simple_search(query, ctx).await,
        }
    }

    async fn research_topic(
        &self,
        topic: &str,
        questions: &[String],
        ctx: &CallContext,
    ) -> ClientResult<ResearchReport> {
        match self {
            Self::Chat(a) => a.research_topic(topic, questions, ctx).await,
            Self::Search(a) => a.research_topic(topic, questions, ctx).await,
            Self::Multimodal(a) => a.research_topic(topic, questions, ctx).await,
        }
    }

    fn get_citations(&self, response: &ResponseEnvelope) -> ClientResult<Vec<Citation>> {
        match self {
            Self::Chat(a) => a.get_citations(response),
            Self::Search(a) => a.get_citations(response),
            Self::Multimodal(a) => a.get_citations(response),
        }
    }

    async fn create_image(&self, request: &ImageRequest) -> ClientResult<ImageResponse> {
        match self {
            Self::Chat(a) => a.create_image(request).await,
            Self::Search(a) => a.create_image(request).await,
            Self::Multimodal(a) => a.create_image(request).await,
        }
    }

    async fn analyze_image(&self, request: &ImageAnalysisRequest) -> ClientResult<ResponseEnvelope> {
        match self {
            Self::Chat(a) => a.analyze_image(request).await,
            Self::Search(a) => a.analyze_image(request).await,
            Self::Multimodal(a) => a.analyze_image(request).await,
        }
    }

    async fn test_connection(&self) -> bool {
        match self {
            Self::Chat(a) => a.test_connection().await,
            Self::Search(a) => a.test_connection().await,
            Self::Multimodal(a) => a.test_connection().await,
        }
    }

    async fn close(&self) -> ClientResult<()> {
        match self {
            Self::Chat(a) => a.close().await,
            Self::Search(a) => a.close().await,
            Self::Multimodal(a) => a.close().await,
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Chat(a) => a.is_closed(),
            Self::Search(a) => a.is_closed(),
            Self::Multimodal(a) => a.is_closed(),
        }
    }
}
