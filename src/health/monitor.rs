//! Active health checking and client recreation.
//!
//! # Responsibilities
//! - Own the live data store client behind an atomically swappable handle
//! - Periodically probe the client and update the shared health state
//! - Build, verify and install a replacement once failures reach the threshold

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::datastore::{ClientFactory, DataStoreClient, DataStoreError, DataStoreResult};
use crate::health::state::{HealthState, SharedHealth};
use crate::observability::metrics;

/// The installed client plus bookkeeping about when it was built.
///
/// Never mutated after construction; recreation installs a new handle.
#[derive(Debug)]
pub struct RemoteClientHandle {
    client: Arc<dyn DataStoreClient>,
    generation: u64,
    created_at: DateTime<Utc>,
}

impl RemoteClientHandle {
    fn new(client: Arc<dyn DataStoreClient>, generation: u64) -> Self {
        Self {
            client,
            generation,
            created_at: Utc::now(),
        }
    }

    pub fn client(&self) -> &Arc<dyn DataStoreClient> {
        &self.client
    }

    /// 0 for the startup client, incremented by each recreation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub struct HealthMonitor {
    handle: ArcSwap<RemoteClientHandle>,
    state: SharedHealth,
    factory: Arc<dyn ClientFactory>,
    config: HealthCheckConfig,
    generations: AtomicU64,
    recreating: Mutex<()>,
}

impl HealthMonitor {
    pub fn new(
        client: Arc<dyn DataStoreClient>,
        factory: Arc<dyn ClientFactory>,
        config: HealthCheckConfig,
    ) -> Self {
        metrics::record_datastore_health(&HealthState::initial());
        Self {
            handle: ArcSwap::from_pointee(RemoteClientHandle::new(client, 0)),
            state: SharedHealth::new(HealthState::initial()),
            factory,
            config,
            generations: AtomicU64::new(0),
            recreating: Mutex::new(()),
        }
    }

    /// Build the startup client through `factory` and wrap it.
    pub async fn connect(
        factory: Arc<dyn ClientFactory>,
        config: HealthCheckConfig,
    ) -> DataStoreResult<Self> {
        let client = factory.build().await?;
        Ok(Self::new(client, factory, config))
    }

    /// The client to use for one operation.
    pub fn client(&self) -> Arc<dyn DataStoreClient> {
        self.handle.load().client.clone()
    }

    pub fn handle(&self) -> Arc<RemoteClientHandle> {
        self.handle.load_full()
    }

    pub fn is_healthy(&self) -> bool {
        self.state.snapshot().healthy
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.state.snapshot().last_checked_at
    }

    pub fn consecutive_failure_count(&self) -> u32 {
        self.state.snapshot().consecutive_failures
    }

    pub fn snapshot(&self) -> HealthState {
        self.state.snapshot()
    }

    pub fn failure_threshold(&self) -> u32 {
        self.config.failure_threshold
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.config.probe_timeout_secs)
    }

    async fn probe_client(&self, client: &dyn DataStoreClient) -> DataStoreResult<()> {
        let timeout = self.probe_timeout();
        match time::timeout(timeout, client.probe()).await {
            Ok(result) => result,
            Err(_) => Err(DataStoreError::Timeout(timeout)),
        }
    }

    /// Probe the installed client once and record the outcome.
    pub async fn probe(&self) -> bool {
        let probed = self.handle.load_full();
        let result = self.probe_client(probed.client.as_ref()).await;

        match result {
            Ok(()) => {
                let (before, after) = self.state.update(|s| s.record_success(Utc::now()));
                if !before.healthy {
                    tracing::info!(
                        generation = probed.generation,
                        previous_failures = before.consecutive_failures,
                        "Data store healthy again"
                    );
                }
                metrics::record_probe(true);
                metrics::record_datastore_health(&after);
                true
            }
            Err(e) => {
                if self.handle.load().generation != probed.generation {
                    // a replacement was installed while this probe was in flight
                    tracing::debug!(error = %e, "Ignoring probe failure of a retired client");
                    return false;
                }
                let (before, after) = self.state.update(|s| s.record_failure(Utc::now()));
                if before.healthy {
                    tracing::warn!(
                        generation = probed.generation,
                        error = %e,
                        "Data store became unhealthy"
                    );
                } else {
                    tracing::debug!(
                        consecutive_failures = after.consecutive_failures,
                        error = %e,
                        "Data store probe failed"
                    );
                }
                metrics::record_probe(false);
                metrics::record_datastore_health(&after);
                false
            }
        }
    }

    /// Replace the client if failures have reached the threshold.
    ///
    /// The replacement must pass its own probe before it is installed. On any
    /// failure the current client stays and the failure count is left alone,
    /// so the next scheduled cycle decides again. Returns true when a new
    /// client was installed.
    pub async fn maybe_recreate(&self) -> bool {
        let failures = self.consecutive_failure_count();
        if failures < self.config.failure_threshold {
            return false;
        }

        let Ok(_guard) = self.recreating.try_lock() else {
            tracing::debug!("Client recreation already in progress");
            return false;
        };

        tracing::info!(
            consecutive_failures = failures,
            threshold = self.config.failure_threshold,
            "Recreating data store client"
        );

        let candidate = match self.factory.build().await {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build replacement data store client");
                metrics::record_recreation(false);
                return false;
            }
        };

        if let Err(e) = self.probe_client(candidate.as_ref()).await {
            tracing::warn!(error = %e, "Replacement client failed its probe, discarding it");
            metrics::record_recreation(false);
            return false;
        }

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        self.handle
            .store(Arc::new(RemoteClientHandle::new(candidate, generation)));
        let (_, after) = self.state.update(|s| s.record_success(Utc::now()));

        tracing::info!(generation, "Installed replacement data store client");
        metrics::record_recreation(true);
        metrics::record_datastore_health(&after);
        true
    }

    /// One scheduled cycle: probe, and on failure consider recreation.
    pub async fn check(&self) {
        if !self.probe().await {
            self.maybe_recreate().await;
        }
    }

    /// Run the probe loop until `shutdown` fires.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Scheduled health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            threshold = self.config.failure_threshold,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("state", &self.state.snapshot())
            .field("generation", &self.handle.load().generation)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClient, MockFactory};

    fn config(threshold: u32) -> HealthCheckConfig {
        HealthCheckConfig {
            enabled: true,
            interval_secs: 1,
            probe_timeout_secs: 1,
            failure_threshold: threshold,
        }
    }

    fn monitor(client: Arc<MockClient>, factory: Arc<MockFactory>) -> HealthMonitor {
        HealthMonitor::new(client, factory, config(3))
    }

    #[tokio::test]
    async fn test_probe_success_and_failure() {
        let client = Arc::new(MockClient::healthy());
        let monitor = monitor(client.clone(), Arc::new(MockFactory::default()));
        assert!(monitor.last_checked_at().is_none());

        assert!(monitor.probe().await);
        assert!(monitor.is_healthy());
        assert!(monitor.last_checked_at().is_some());

        client.set_healthy(false);
        assert!(!monitor.probe().await);
        assert!(!monitor.is_healthy());
        assert_eq!(monitor.consecutive_failure_count(), 1);

        client.set_healthy(true);
        assert!(monitor.probe().await);
        assert_eq!(monitor.consecutive_failure_count(), 0);
    }

    #[tokio::test]
    async fn test_probe_timeout_counts_as_failure() {
        let client = Arc::new(MockClient::healthy());
        client.set_probe_delay(Duration::from_millis(1500));
        let monitor = monitor(client, Arc::new(MockFactory::default()));

        assert!(!monitor.probe().await);
        assert_eq!(monitor.consecutive_failure_count(), 1);
    }

    #[tokio::test]
    async fn test_no_recreation_below_threshold() {
        let factory = Arc::new(MockFactory::default());
        let monitor = monitor(Arc::new(MockClient::unhealthy()), factory.clone());

        for _ in 0..2 {
            monitor.check().await;
        }
        assert_eq!(monitor.consecutive_failure_count(), 2);
        assert_eq!(factory.builds(), 0);
        assert!(!monitor.maybe_recreate().await);
        assert_eq!(factory.builds(), 0);
    }

    #[tokio::test]
    async fn test_recreation_at_threshold() {
        let factory = Arc::new(MockFactory::default());
        let monitor = monitor(Arc::new(MockClient::unhealthy()), factory.clone());

        for _ in 0..3 {
            assert!(!monitor.probe().await);
        }
        assert_eq!(monitor.consecutive_failure_count(), 3);

        assert!(monitor.maybe_recreate().await);
        assert_eq!(factory.builds(), 1);
        assert!(monitor.is_healthy());
        assert_eq!(monitor.consecutive_failure_count(), 0);
        assert_eq!(monitor.handle().generation(), 1);

        // the replacement is what callers get now
        assert!(monitor.probe().await);
    }

    #[tokio::test]
    async fn test_failed_recreation_keeps_counter() {
        let factory = Arc::new(MockFactory::default());
        factory.set_clients_healthy(false);
        let client = Arc::new(MockClient::unhealthy());
        let monitor = monitor(client.clone(), factory.clone());

        let mut counts = Vec::new();
        for _ in 0..5 {
            monitor.check().await;
            counts.push(monitor.consecutive_failure_count());
        }
        client.set_healthy(true);
        monitor.check().await;
        counts.push(monitor.consecutive_failure_count());

        assert_eq!(counts, vec![1, 2, 3, 4, 5, 0]);
        // cycles 3, 4 and 5 each tried once
        assert_eq!(factory.builds(), 3);
        assert_eq!(monitor.handle().generation(), 0);
    }

    #[tokio::test]
    async fn test_recreation_resets_sequence() {
        let factory = Arc::new(MockFactory::default());
        let monitor = monitor(Arc::new(MockClient::unhealthy()), factory.clone());

        let mut counts = Vec::new();
        for _ in 0..5 {
            monitor.check().await;
            counts.push(monitor.consecutive_failure_count());
        }

        // the third cycle recreated, later cycles probe the healthy replacement
        assert_eq!(counts, vec![1, 2, 0, 0, 0]);
        assert_eq!(factory.builds(), 1);
    }

    #[tokio::test]
    async fn test_build_failure_is_not_fatal() {
        let factory = Arc::new(MockFactory::default());
        factory.set_fail_builds(true);
        let monitor = monitor(Arc::new(MockClient::unhealthy()), factory.clone());

        for _ in 0..4 {
            monitor.check().await;
        }
        assert!(!monitor.is_healthy());
        assert_eq!(monitor.consecutive_failure_count(), 4);
        assert_eq!(factory.builds(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let client = Arc::new(MockClient::healthy());
        let monitor = Arc::new(monitor(client.clone(), Arc::new(MockFactory::default())));
        let (tx, rx) = broadcast::channel(1);

        let task = tokio::spawn(monitor.clone().run(rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("monitor loop did not stop")
            .unwrap();
        // first tick fires immediately
        assert!(client.probe_calls() >= 1);
    }
}
