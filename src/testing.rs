//! In-memory doubles shared by unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::datastore::{ClientFactory, DataStoreClient, DataStoreError, DataStoreResult};
use crate::secrets::{Result as SecretResult, SecretError, SecretStore};

/// Data store client whose health is flipped by the test.
#[derive(Debug)]
pub struct MockClient {
    healthy: AtomicBool,
    probe_delay: Mutex<Duration>,
    op_delay: Mutex<Duration>,
    probe_calls: AtomicU32,
    op_calls: AtomicU32,
}

impl MockClient {
    pub fn healthy() -> Self {
        Self::with_health(true)
    }

    pub fn unhealthy() -> Self {
        Self::with_health(false)
    }

    fn with_health(healthy: bool) -> Self {
        Self {
            healthy: AtomicBool::new(healthy),
            probe_delay: Mutex::new(Duration::ZERO),
            op_delay: Mutex::new(Duration::ZERO),
            probe_calls: AtomicU32::new(0),
            op_calls: AtomicU32::new(0),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_probe_delay(&self, delay: Duration) {
        *self.probe_delay.lock().unwrap() = delay;
    }

    /// Make every operation other than `probe` stall before answering.
    pub fn set_op_delay(&self, delay: Duration) {
        *self.op_delay.lock().unwrap() = delay;
    }

    pub fn probe_calls(&self) -> u32 {
        self.probe_calls.load(Ordering::SeqCst)
    }

    /// Calls to anything other than `probe`.
    pub fn op_calls(&self) -> u32 {
        self.op_calls.load(Ordering::SeqCst)
    }

    async fn operation(&self) -> DataStoreResult<()> {
        self.op_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.op_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check()
    }

    fn check(&self) -> DataStoreResult<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DataStoreError::Network("connection refused".into()))
        }
    }
}

#[async_trait]
impl DataStoreClient for MockClient {
    async fn probe(&self) -> DataStoreResult<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.probe_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check()
    }

    async fn list_tables(&self, limit: usize) -> DataStoreResult<Vec<String>> {
        self.operation().await?;
        Ok(["events", "donations"]
            .iter()
            .take(limit)
            .map(|t| t.to_string())
            .collect())
    }

    async fn get_item(&self, table: &str, id: &str) -> DataStoreResult<serde_json::Value> {
        self.operation().await?;
        if id == "missing" {
            return Err(DataStoreError::Remote {
                status: 404,
                code: Some("ResourceNotFoundException".into()),
                message: format!("No item '{}' in '{}'", id, table),
            });
        }
        Ok(serde_json::json!({ "id": id, "table": table }))
    }
}

/// Factory handing out [`MockClient`]s and counting build attempts.
#[derive(Default)]
pub struct MockFactory {
    clients_unhealthy: AtomicBool,
    fail_builds: AtomicBool,
    builds: AtomicU32,
}

impl MockFactory {
    pub fn set_clients_healthy(&self, healthy: bool) {
        self.clients_unhealthy.store(!healthy, Ordering::SeqCst);
    }

    pub fn set_fail_builds(&self, fail: bool) {
        self.fail_builds.store(fail, Ordering::SeqCst);
    }

    /// Build attempts, failed ones included.
    pub fn builds(&self) -> u32 {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn build(&self) -> DataStoreResult<Arc<dyn DataStoreClient>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_builds.load(Ordering::SeqCst) {
            return Err(DataStoreError::Build("credentials unavailable".into()));
        }
        let client = if self.clients_unhealthy.load(Ordering::SeqCst) {
            MockClient::unhealthy()
        } else {
            MockClient::healthy()
        };
        Ok(Arc::new(client))
    }
}

/// Secret store backed by a map, with switchable failure and latency.
#[derive(Default)]
pub struct MemorySecretStore {
    values: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
    delay: Mutex<Duration>,
    get_calls: AtomicU32,
}

impl MemorySecretStore {
    pub fn with(values: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (key, value) in values {
            store.insert(key, value);
        }
        store
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> SecretResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SecretError::Network("store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str, _decrypt: bool) -> SecretResult<String> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        self.values
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, value: &str, _encrypt: bool) -> SecretResult<()> {
        self.check()?;
        self.insert(key, value);
        Ok(())
    }
}
