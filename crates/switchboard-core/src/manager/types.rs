//! Core ClientManager type definition

use crate::clock::{SharedClock, system_clock};
use crate::config::{ManagerConfig, ProviderConfig};
use crate::error::{ClientError, ClientResult};
use crate::providers::ClientInstance;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Live clients and the last initialization failure of each provider
#[derive(Default)]
pub(super) struct Registry {
    pub(super) clients: BTreeMap<String, Arc<ClientInstance>>,
    pub(super) init_errors: BTreeMap<String, ClientError>,
}

/// Registry of live provider clients keyed by provider id.
///
/// One lock guards both maps. It only covers map mutation and is never held
/// while a client performs I/O.
pub struct ClientManager {
    pub(super) configs: BTreeMap<String, ProviderConfig>,
    pub(super) clock: SharedClock,
    pub(super) registry: Mutex<Registry>,
}

impl ClientManager {
    /// Manager over `configs`; a later config with the same id wins
    pub fn new(configs: impl IntoIterator<Item = ProviderConfig>) -> Self {
        Self::with_clock(configs, system_clock())
    }

    /// Manager whose clients share an injected clock
    pub fn with_clock(configs: impl IntoIterator<Item = ProviderConfig>, clock: SharedClock) -> Self {
        let configs = configs
            .into_iter()
            .map(|config| (config.provider_id.clone(), config))
            .collect();
        Self {
            configs,
            clock,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Manager for every provider found in the environment
    pub fn from_env() -> ClientResult<Self> {
        Ok(Self::from(ManagerConfig::from_env()?))
    }

    /// Configuration for `provider_id`
    pub fn config(&self, provider_id: &str) -> Option<&ProviderConfig> {
        self.configs.get(provider_id)
    }

    /// Every configured provider id, initialized or not
    pub fn configured_providers(&self) -> Vec<String> {
        self.configs.keys().cloned().collect()
    }

    /// Live client for `provider_id`
    pub fn get(&self, provider_id: &str) -> Option<Arc<ClientInstance>> {
        self.registry.lock().clients.get(provider_id).cloned()
    }

    /// Ids of the currently initialized providers, sorted
    pub fn active_providers(&self) -> Vec<String> {
        self.registry.lock().clients.keys().cloned().collect()
    }

    /// Why each failed provider could not be initialized
    pub fn initialization_errors(&self) -> BTreeMap<String, ClientError> {
        self.registry.lock().init_errors.clone()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().clients.is_empty()
    }
}

impl From<ManagerConfig> for ClientManager {
    fn from(config: ManagerConfig) -> Self {
        Self::new(config.providers)
    }
}

impl fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientManager")
            .field("configured", &self.configs.keys().collect::<Vec<_>>())
            .field("active", &self.active_providers())
            .finish()
    }
}
