//! Client construction.
//!
//! The health monitor rebuilds the data store client through a factory so a
//! replacement picks up the current configuration and credentials instead of
//! inheriting whatever state the broken client was in.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DataStoreConfig;
use crate::datastore::client::{Credentials, DataStoreClient, HttpDataStoreClient};
use crate::datastore::error::{DataStoreError, DataStoreResult};
use crate::secrets::SecretCache;

/// Builds fresh data store clients.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn build(&self) -> DataStoreResult<Arc<dyn DataStoreClient>>;
}

/// Factory producing [`HttpDataStoreClient`]s.
pub struct HttpClientFactory {
    config: DataStoreConfig,
    secrets: Option<Arc<SecretCache>>,
}

impl HttpClientFactory {
    pub fn new(config: DataStoreConfig, secrets: Option<Arc<SecretCache>>) -> Self {
        Self { config, secrets }
    }

    /// Resolve credentials for a new client.
    ///
    /// A configured `credentials_secret` goes through the secret cache on every
    /// build, so a rotated value is seen once the cached entry expires.
    async fn credentials(&self) -> DataStoreResult<Credentials> {
        if let Some(name) = &self.config.credentials_secret {
            let secrets = self.secrets.as_ref().ok_or_else(|| {
                DataStoreError::Build(format!(
                    "credentials_secret '{}' configured without a secret cache",
                    name
                ))
            })?;
            let token = secrets.get(name, true).await.map_err(|e| {
                DataStoreError::Build(format!("Failed to resolve credentials '{}': {}", name, e))
            })?;
            return Ok(Credentials::Token(token));
        }

        match (&self.config.access_key_id, &self.config.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(Credentials::Static {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            }),
            _ => Ok(Credentials::Anonymous),
        }
    }
}

#[async_trait]
impl ClientFactory for HttpClientFactory {
    async fn build(&self) -> DataStoreResult<Arc<dyn DataStoreClient>> {
        let credentials = self.credentials().await?;
        let client = HttpDataStoreClient::new(&self.config, credentials)?;
        tracing::debug!(client = ?client, "Built data store client");
        Ok(Arc::new(client))
    }
}
