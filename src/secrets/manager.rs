//! Cached secret access with a fallback store.
//!
//! # Responsibilities
//! - Serve `(key, decrypt)` lookups from a TTL cache before touching a store
//! - Fall back to a secondary store when the primary fails or lacks the key
//! - Eagerly fetch the required secrets once, retrying from scratch on failure
//!
//! # Design Decisions
//! - A fallback miss reports the primary's error, which names the real cause
//! - Writes go to the primary only and invalidate both decrypt variants;
//!   a write to a required name also replaces its eagerly loaded value
//! - Initialization is single-flight: concurrent callers share one fetch

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::cache::ExpiringCache;
use super::store::{EnvSecretStore, HttpParameterStore, SecretStore};
use super::{Result, SecretError};
use crate::config::SecretsConfig;
use crate::observability::metrics;

pub struct SecretCache {
    primary: Arc<dyn SecretStore>,
    fallback: Arc<dyn SecretStore>,
    entries: ExpiringCache<(String, bool), String>,
    required: Vec<String>,
    initialized: OnceCell<DashMap<String, String>>,
    payment_secret_key_name: String,
    payment_publishable_key_name: String,
}

impl SecretCache {
    pub fn new(
        primary: Arc<dyn SecretStore>,
        fallback: Arc<dyn SecretStore>,
        ttl: Duration,
        required: Vec<String>,
    ) -> Self {
        let defaults = SecretsConfig::default();
        Self {
            primary,
            fallback,
            entries: ExpiringCache::new(ttl),
            required,
            initialized: OnceCell::new(),
            payment_secret_key_name: defaults.payment_secret_key_name,
            payment_publishable_key_name: defaults.payment_publishable_key_name,
        }
    }

    /// Build the stores described by `config`.
    ///
    /// Without an endpoint the environment serves as both primary and fallback.
    pub fn from_config(config: &SecretsConfig) -> Result<Self> {
        let fallback: Arc<dyn SecretStore> = Arc::new(EnvSecretStore::new());
        let primary: Arc<dyn SecretStore> = match &config.endpoint {
            Some(endpoint) => Arc::new(HttpParameterStore::new(
                endpoint,
                config.api_token.clone(),
                Duration::from_millis(config.timeout_ms),
            )?),
            None => {
                tracing::info!("No secret store endpoint configured, reading secrets from the environment");
                fallback.clone()
            }
        };

        Ok(Self::new(primary, fallback, config.cache_ttl(), config.required.clone())
            .with_payment_keys(
                &config.payment_secret_key_name,
                &config.payment_publishable_key_name,
            ))
    }

    pub fn with_payment_keys(mut self, secret_key_name: &str, publishable_key_name: &str) -> Self {
        self.payment_secret_key_name = secret_key_name.to_string();
        self.payment_publishable_key_name = publishable_key_name.to_string();
        self
    }

    /// Look up `key`, from cache when fresh, else primary, else fallback.
    pub async fn get(&self, key: &str, decrypt: bool) -> Result<String> {
        let cache_key = (key.to_string(), decrypt);
        if let Some(value) = self.entries.get(&cache_key) {
            metrics::record_secret_lookup("cache");
            return Ok(value);
        }

        let primary_error = match self.primary.get(key, decrypt).await {
            Ok(value) => {
                metrics::record_secret_lookup("primary");
                self.entries.insert(cache_key, value.clone());
                return Ok(value);
            }
            Err(e) => e,
        };

        match self.fallback.get(key, decrypt).await {
            Ok(value) => {
                tracing::warn!(
                    key,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %primary_error,
                    "Primary secret store failed, served from fallback"
                );
                metrics::record_secret_lookup("fallback");
                self.entries.insert(cache_key, value.clone());
                Ok(value)
            }
            Err(fallback_error) => {
                tracing::error!(
                    key,
                    error = %primary_error,
                    fallback_error = %fallback_error,
                    "Secret unavailable from every store"
                );
                Err(primary_error)
            }
        }
    }

    /// Write through to the primary store and drop cached copies of `key`.
    pub async fn put(&self, key: &str, value: &str, encrypt: bool) -> Result<()> {
        self.primary.put(key, value, encrypt).await?;
        self.entries.invalidate(&(key.to_string(), true));
        self.entries.invalidate(&(key.to_string(), false));
        if let Some(mut loaded) = self.initialized.get().and_then(|values| values.get_mut(key)) {
            *loaded = value.to_string();
        }
        Ok(())
    }

    /// Fetch every required secret, once.
    ///
    /// On failure nothing is recorded, so the next call starts over.
    pub async fn initialize(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                let values = DashMap::with_capacity(self.required.len());
                for name in &self.required {
                    let value = self.get(name, true).await?;
                    values.insert(name.clone(), value);
                }
                tracing::info!(count = values.len(), "Required secrets loaded");
                Ok::<_, SecretError>(values)
            })
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Named secret for route handlers. Required secrets come from the
    /// eager fetch; anything else goes through [`get`](Self::get).
    pub async fn get_secret(&self, name: &str) -> Result<String> {
        self.initialize().await?;
        if let Some(value) = self.initialized.get().and_then(|values| values.get(name)) {
            return Ok(value.value().clone());
        }
        self.get(name, true).await
    }

    pub async fn payment_secret_key(&self) -> Result<String> {
        self.get_secret(&self.payment_secret_key_name).await
    }

    pub async fn payment_publishable_key(&self) -> Result<String> {
        self.get_secret(&self.payment_publishable_key_name).await
    }
}
