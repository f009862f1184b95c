//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the backend-for-frontend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BffConfig {
    /// Listener configuration (bind address, api prefix).
    pub listener: ListenerConfig,

    /// Remote data store connection settings.
    pub data_store: DataStoreConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Per-request retry configuration.
    pub retries: RetryConfig,

    /// Secret/parameter store settings.
    pub secrets: SecretsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl BffConfig {
    /// Upper bound on one gated request that runs a full retry sequence.
    ///
    /// The gate may probe once, each request-level attempt may run a whole
    /// client-layer operation, and every gap between attempts holds the fixed
    /// delay plus one probe.
    pub fn retry_budget(&self) -> Duration {
        let probe = Duration::from_secs(self.health_check.probe_timeout_secs);
        let attempts = self.retries.max_attempts.max(1);
        let gap = Duration::from_millis(self.retries.delay_ms) + probe;
        probe + self.data_store.worst_case_operation() * attempts + gap * (attempts - 1)
    }

    /// Outer deadline for an inbound request: the configured value, else the
    /// retry budget rounded up to whole seconds.
    pub fn request_deadline(&self) -> Duration {
        match self.timeouts.server_request_secs {
            Some(secs) => Duration::from_secs(secs),
            None => {
                let budget = self.retry_budget();
                let whole = budget.as_secs() + u64::from(budget.subsec_nanos() > 0);
                Duration::from_secs(whole)
            }
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path prefix of the data-access routes guarded by the health gate.
    pub api_prefix: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            api_prefix: "/api".to_string(),
        }
    }
}

/// Remote data store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataStoreConfig {
    /// Base URL of the data store API.
    pub endpoint: String,

    /// Region the store lives in, sent with every request.
    pub region: String,

    /// Static access key id. Ignored when `credentials_secret` is set.
    pub access_key_id: Option<String>,

    /// Static secret access key. Ignored when `credentials_secret` is set.
    pub secret_access_key: Option<String>,

    /// Secret name holding the access token, resolved on every client build.
    pub credentials_secret: Option<String>,

    /// Client-layer attempts per operation (including the first).
    pub max_attempts: u32,

    /// Per-attempt request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Base delay for the client-layer exponential backoff in milliseconds.
    pub backoff_base_ms: u64,

    /// Maximum client-layer backoff delay in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for DataStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            credentials_secret: None,
            max_attempts: 5,
            request_timeout_secs: 120,
            connect_timeout_secs: 30,
            backoff_base_ms: 100,
            backoff_max_ms: 2000,
        }
    }
}

impl DataStoreConfig {
    /// Longest one client-layer operation can take: every attempt hits the
    /// request timeout and every backoff draws its maximum jitter.
    pub fn worst_case_operation(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let backoff_ms: u64 = (1..attempts)
            .map(|attempt| {
                let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
                let capped = self.backoff_base_ms.saturating_mul(factor).min(self.backoff_max_ms);
                capped + capped / 10
            })
            .sum();
        self.request_timeout() * attempts + Duration::from_millis(backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the scheduled probe loop.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in seconds.
    pub probe_timeout_secs: u64,

    /// Number of consecutive failures before the client is recreated.
    pub failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            probe_timeout_secs: 5,
            failure_threshold: 3,
        }
    }
}

/// Per-request retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub delay_ms: u64,

    /// Hint returned to clients when the gate rejects a request.
    pub retry_after_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
            retry_after_secs: 30,
        }
    }
}

/// Secret/parameter store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Parameter store base URL. When absent, the environment is the only store.
    pub endpoint: Option<String>,

    /// Bearer token for the parameter store.
    pub api_token: Option<String>,

    /// Cache TTL in seconds.
    pub cache_ttl_secs: u64,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Secret names fetched eagerly by `initialize()`.
    pub required: Vec<String>,

    /// Name of the payment provider secret key.
    pub payment_secret_key_name: String,

    /// Name of the payment provider publishable key.
    pub payment_publishable_key_name: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        let secret = "payment/stripe-secret-key".to_string();
        let publishable = "payment/stripe-publishable-key".to_string();
        Self {
            endpoint: None,
            api_token: None,
            cache_ttl_secs: 300, // 5 minutes
            timeout_ms: 10_000,
            required: vec![secret.clone(), publishable.clone()],
            payment_secret_key_name: secret,
            payment_publishable_key_name: publishable,
        }
    }
}

impl SecretsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Timeout configuration for the HTTP surface.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outer deadline for a whole inbound request in seconds.
    /// Unset means the full retry budget, see [`BffConfig::retry_budget`].
    pub server_request_secs: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
