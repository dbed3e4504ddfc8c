//! Provider configuration and loaders

mod loader;
mod provider;


pub use loader::ManagerConfig;
pub use provider::{
    DEFAULT_AZURE_API_VERSION, MAX_RETRY_DELAY_LIMIT, ProviderConfig, ProviderKind,
    is_url_safe_name,
};
