//! Initialization, health checks and shutdown

use super::types::ClientManager;
use crate::client::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::providers::ClientInstance;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

impl ClientManager {
    /// Build the client for `provider_id`.
    ///
    /// A previously initialized client for the same id is replaced and
    /// closed. On failure the error is recorded and any previous client
    /// stays registered.
    #[instrument(skip(self), level = "debug")]
    pub async fn initialize(&self, provider_id: &str) -> ClientResult<Arc<ClientInstance>> {
        let config = self.configs.get(provider_id).ok_or_else(|| {
            ClientError::configuration(provider_id, "provider is not configured")
        })?;

        let instance = match ClientInstance::from_config(config, self.clock.clone()) {
            Ok(instance) => Arc::new(instance),
            Err(e) => {
                self.registry
                    .lock()
                    .init_errors
                    .insert(provider_id.to_string(), e.clone());
                return Err(e);
            }
        };

        let previous = {
            let mut registry = self.registry.lock();
            registry.init_errors.remove(provider_id);
            registry
                .clients
                .insert(provider_id.to_string(), instance.clone())
        };

        if let Some(previous) = previous {
            debug!(provider = %provider_id, "closing replaced client");
            if let Err(e) = previous.close().await {
                warn!(provider = %provider_id, error = %e, "failed to close replaced client");
            }
        }

        info!(provider = %provider_id, kind = %instance.kind(), "provider initialized");
        Ok(instance)
    }

    /// Initialize every configured provider independently.
    ///
    /// One provider failing, for example for lack of a credential, does not
    /// affect the others.
    pub async fn initialize_all(&self) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();
        for provider_id in self.configs.keys() {
            let ok = match self.initialize(provider_id).await {
                Ok(_) => true,
                Err(e) => {
                    warn!(provider = %provider_id, error = %e, "provider initialization failed");
                    false
                }
            };
            results.insert(provider_id.clone(), ok);
        }
        results
    }

    /// Check the connection of every initialized provider concurrently
    pub async fn test_connections(&self) -> BTreeMap<String, bool> {
        let snapshot: Vec<(String, Arc<ClientInstance>)> = self
            .registry
            .lock()
            .clients
            .iter()
            .map(|(id, client)| (id.clone(), client.clone()))
            .collect();

        let checks = snapshot.into_iter().map(|(id, client)| async move {
            let ok = client.test_connection().await;
            debug!(provider = %id, ok, "connection check finished");
            (id, ok)
        });
        join_all(checks).await.into_iter().collect()
    }

    /// Close and drop every client.
    ///
    /// The registry is empty afterwards even when a close fails; the first
    /// failure is returned once every client has been attempted.
    pub async fn close_all(&self) -> ClientResult<()> {
        let clients = std::mem::take(&mut self.registry.lock().clients);
        if clients.is_empty() {
            return Ok(());
        }

        let mut first_error = None;
        for (provider_id, client) in clients {
            if let Err(e) = client.close().await {
                warn!(provider = %provider_id, error = %e, "failed to close client");
                first_error.get_or_insert(e);
            }
        }
        info!("all provider clients closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
