//! Startup orchestration.
//!
//! # Order
//! ```text
//! SecretCache::from_config → initialize (failure logged, not fatal)
//!     → HttpClientFactory (credentials through the secret cache)
//!     → HealthMonitor::connect (builds the startup client)
//!     → RetryCoordinator
//! ```
//!
//! [`run`] then owns the monitor loop and the server until the stop future
//! resolves, and joins the loop before returning.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

use crate::config::BffConfig;
use crate::datastore::{ClientFactory, DataStoreError, HttpClientFactory};
use crate::health::HealthMonitor;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::resilience::RetryCoordinator;
use crate::secrets::{SecretCache, SecretError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Secret store setup failed: {0}")]
    Secrets(#[from] SecretError),

    #[error("Data store client setup failed: {0}")]
    DataStore(#[from] DataStoreError),
}

/// Process-wide services, built once and shared by reference.
#[derive(Clone)]
pub struct Services {
    pub secrets: Arc<SecretCache>,
    pub monitor: Arc<HealthMonitor>,
    pub coordinator: Arc<RetryCoordinator>,
    pub started_at: Instant,
}

impl Services {
    /// Wire services from already-built parts.
    pub fn new(secrets: Arc<SecretCache>, monitor: Arc<HealthMonitor>, config: &BffConfig) -> Self {
        let coordinator = Arc::new(RetryCoordinator::from_config(monitor.clone(), &config.retries));
        Self {
            secrets,
            monitor,
            coordinator,
            started_at: Instant::now(),
        }
    }
}

/// Build every service from `config`.
pub async fn bootstrap(config: &BffConfig) -> Result<Services, StartupError> {
    let secrets = Arc::new(SecretCache::from_config(&config.secrets)?);
    if let Err(e) = secrets.initialize().await {
        // routes needing these secrets retry initialization on demand
        tracing::warn!(error = %e, "Required secrets unavailable at startup");
    }

    let factory: Arc<dyn ClientFactory> = Arc::new(HttpClientFactory::new(
        config.data_store.clone(),
        Some(secrets.clone()),
    ));
    let monitor = Arc::new(HealthMonitor::connect(factory, config.health_check.clone()).await?);

    tracing::info!(
        endpoint = %config.data_store.endpoint,
        region = %config.data_store.region,
        interval_secs = config.health_check.interval_secs,
        failure_threshold = config.health_check.failure_threshold,
        "Services initialized"
    );

    Ok(Services::new(secrets, monitor, config))
}

/// Serve on `listener` with the monitor loop running, until `stop` resolves.
///
/// Both shutdown receivers exist before `stop` is first polled, so a stop
/// that resolves immediately still reaches the server and the monitor.
pub async fn run<F>(
    config: BffConfig,
    services: Services,
    listener: TcpListener,
    stop: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = &'static str> + Send + 'static,
{
    let shutdown = Shutdown::new();
    let server_rx = shutdown.subscribe();
    let monitor_rx = shutdown.subscribe();

    let monitor_task = tokio::spawn(services.monitor.clone().run(monitor_rx));
    let trigger = shutdown.clone();
    let stop_task = tokio::spawn(async move {
        let reason = stop.await;
        tracing::info!(reason, "Shutdown requested");
        trigger.trigger();
    });

    let served = HttpServer::new(config, services).run(listener, server_rx).await;

    // stop the probe loop even if the server failed
    shutdown.trigger();
    stop_task.abort();
    if let Err(e) = monitor_task.await {
        tracing::error!(error = %e, "Health monitor task failed");
    }
    served
}
