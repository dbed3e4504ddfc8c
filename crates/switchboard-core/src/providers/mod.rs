//! Provider adapters

pub mod chat;
pub mod instance;
pub mod multimodal;
pub mod openai_compat;
pub mod search;
pub mod structured;

#[cfg(test)]
mod chat_tests;

pub use chat::{ChatAdapter, DEFAULT_EMBEDDING_MODEL};
pub use instance::ClientInstance;
pub use multimodal::MultimodalAdapter;
pub use search::{SearchAdapter, SummaryStyle, collect_citations, normalize_url};
pub use structured::StructuredOutput;
