//! Switchboard Core Library
//!
//! A client layer over several AI provider APIs: per-provider sliding-window
//! rate limiting, retries with capped exponential backoff, structured output
//! validation, and a manager that owns one client per configured provider.

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod messages;
pub mod providers;
pub mod resilience;

// Re-export commonly used types
pub use client::{ApiClient, Capability, ClientCore};
pub use clock::{Clock, ManualClock, SharedClock, TokioClock};
pub use config::{ManagerConfig, ProviderConfig, ProviderKind};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use manager::ClientManager;
pub use messages::{
    Citation, EmbeddingRequest, EmbeddingResponse, ImageAnalysisRequest, ImageRequest,
    ImageResponse, Message, RequestEnvelope, ResearchReport, ResponseEnvelope, Role,
    SearchOptions, Usage,
};
pub use providers::{ChatAdapter, ClientInstance, MultimodalAdapter, SearchAdapter};
pub use resilience::{CallContext, RateLimitConfig, RateLimiter, RetryConfig, RetryPolicy};
