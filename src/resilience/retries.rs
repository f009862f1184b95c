//! Retry logic.
//!
//! # Responsibilities
//! - Gate data-access requests on the health monitor's verdict
//! - Run remote operations with bounded, strictly sequential retries
//! - Nudge the health monitor with one probe between attempts
//!
//! # Per-request state machine
//! ```text
//! Admitted → Executing → Succeeded
//!                      → Retrying → Executing      (transient, attempts left)
//!                      → Exhausted → Failed        (transient, no attempts left)
//!                      → Failed                    (permanent)
//! Gated(unhealthy) → Rejected(503)                 (restoration probe failed)
//! ```
//!
//! # Latency bound
//! The coordinator sets no deadline of its own. One sequence is bounded by
//! the gate probe, `max_attempts` whole client-layer operations, and a delay
//! plus a probe between attempts, see [`RetryCoordinator::worst_case_latency`].
//! The HTTP layer's outer deadline defaults to that bound.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::datastore::{DataStoreClient, DataStoreResult};
use crate::health::HealthMonitor;
use crate::observability::metrics;
use crate::resilience::classify::Classify;

/// Immutable retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; never below 1.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
///
/// After each transient failure with attempts remaining, waits
/// `policy.delay` and then awaits `between_attempts` before trying again.
/// The last error is returned unchanged.
pub async fn run_with_retry<T, E, F, Fut, H, HFut>(
    policy: &RetryPolicy,
    mut op: F,
    mut between_attempts: H,
) -> Result<T, E>
where
    E: Classify + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: FnMut() -> HFut,
    HFut: Future<Output = ()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                    metrics::record_retry_outcome("recovered");
                }
                return Ok(value);
            }
            Err(e) if !e.is_transient() => {
                tracing::debug!(attempt, error = %e, "Permanent failure, not retrying");
                metrics::record_retry_outcome("permanent");
                return Err(e);
            }
            Err(e) if attempt >= max_attempts => {
                tracing::warn!(attempt, max_attempts, error = %e, "Retries exhausted");
                metrics::record_retry_outcome("exhausted");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay = ?policy.delay,
                    error = %e,
                    "Transient failure, retrying"
                );
                metrics::record_retry_outcome("retried");
                tokio::time::sleep(policy.delay).await;
                between_attempts().await;
            }
        }
    }
}

/// Result of the inbound health gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Healthy; no probe was needed.
    Admitted,
    /// Was unhealthy, but a synchronous probe succeeded.
    Restored,
    /// Still unhealthy; clients should retry after the hint.
    Rejected { retry_after: Duration },
}

/// Request-scoped resilience: the inbound gate plus the retry-wrapped invoker.
pub struct RetryCoordinator {
    monitor: Arc<HealthMonitor>,
    policy: RetryPolicy,
    retry_after: Duration,
}

impl RetryCoordinator {
    pub fn new(monitor: Arc<HealthMonitor>, policy: RetryPolicy, retry_after: Duration) -> Self {
        Self {
            monitor,
            policy,
            retry_after,
        }
    }

    pub fn from_config(monitor: Arc<HealthMonitor>, config: &RetryConfig) -> Self {
        Self::new(
            monitor,
            RetryPolicy::from(config),
            Duration::from_secs(config.retry_after_secs),
        )
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    /// Decide whether a data-access request may proceed.
    ///
    /// When unhealthy, attempts exactly one synchronous probe before deciding.
    pub async fn admit(&self) -> Admission {
        if self.monitor.is_healthy() {
            return Admission::Admitted;
        }
        if self.monitor.probe().await {
            tracing::info!("Data store restored by gate probe");
            Admission::Restored
        } else {
            metrics::record_gate_rejection();
            Admission::Rejected {
                retry_after: self.retry_after,
            }
        }
    }

    /// Run `op` against the current client with the coordinator's policy.
    ///
    /// Each attempt receives the client installed at that moment, so an
    /// attempt following a recreation uses the replacement.
    pub async fn run_with_retry<T, F, Fut>(&self, op: F) -> DataStoreResult<T>
    where
        F: FnMut(Arc<dyn DataStoreClient>) -> Fut,
        Fut: Future<Output = DataStoreResult<T>>,
    {
        self.run_with_policy(&self.policy, op).await
    }

    /// Same as [`run_with_retry`](Self::run_with_retry) with an explicit policy.
    pub async fn run_with_policy<T, F, Fut>(&self, policy: &RetryPolicy, mut op: F) -> DataStoreResult<T>
    where
        F: FnMut(Arc<dyn DataStoreClient>) -> Fut,
        Fut: Future<Output = DataStoreResult<T>>,
    {
        let monitor = &self.monitor;
        run_with_retry(
            policy,
            || op(monitor.client()),
            move || async move {
                // best effort: a failed probe does not stop the retry
                monitor.probe().await;
            },
        )
        .await
    }

    /// Upper bound on one gated retry sequence, where `operation` is the
    /// longest a single operation can take with its client-layer attempts.
    pub fn worst_case_latency(&self, operation: Duration) -> Duration {
        let probe = self.monitor.probe_timeout();
        let attempts = self.policy.max_attempts.max(1);
        probe + operation * attempts + (self.policy.delay + probe) * (attempts - 1)
    }
}
