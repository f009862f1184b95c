//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts > 0, intervals > 0, TTL > 0)
//! - Check that endpoints and bind addresses parse
//! - Check that an explicit request deadline covers the retry budget
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BffConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

use crate::config::schema::BffConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every semantic constraint and collect the violations.
pub fn validate_config(config: &BffConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if !config.listener.api_prefix.starts_with('/') || config.listener.api_prefix.len() < 2 {
        errors.push(ValidationError::new(
            "listener.api_prefix",
            "must start with '/' and name a path segment",
        ));
    }

    let store = &config.data_store;
    if let Err(e) = Url::parse(&store.endpoint) {
        errors.push(ValidationError::new(
            "data_store.endpoint",
            format!("invalid URL '{}': {}", store.endpoint, e),
        ));
    }
    if store.max_attempts == 0 {
        errors.push(ValidationError::new("data_store.max_attempts", "must be at least 1"));
    }
    if store.request_timeout_secs == 0 {
        errors.push(ValidationError::new("data_store.request_timeout_secs", "must be > 0"));
    }
    if store.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("data_store.connect_timeout_secs", "must be > 0"));
    }
    if store.backoff_base_ms > store.backoff_max_ms {
        errors.push(ValidationError::new(
            "data_store.backoff_base_ms",
            "must not exceed backoff_max_ms",
        ));
    }
    if store.access_key_id.is_some() != store.secret_access_key.is_some() {
        errors.push(ValidationError::new(
            "data_store.access_key_id",
            "access_key_id and secret_access_key must be set together",
        ));
    }

    let health = &config.health_check;
    if health.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be > 0"));
    }
    if health.probe_timeout_secs == 0 {
        errors.push(ValidationError::new("health_check.probe_timeout_secs", "must be > 0"));
    }
    if health.failure_threshold == 0 {
        errors.push(ValidationError::new("health_check.failure_threshold", "must be at least 1"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }

    if let Some(secs) = config.timeouts.server_request_secs {
        let budget = config.retry_budget();
        if Duration::from_secs(secs) < budget {
            errors.push(ValidationError::new(
                "timeouts.server_request_secs",
                format!(
                    "{}s is shorter than the retry budget of {:.1}s; raise it or leave it unset",
                    secs,
                    budget.as_secs_f64()
                ),
            ));
        }
    }

    let secrets = &config.secrets;
    if let Some(endpoint) = &secrets.endpoint {
        if let Err(e) = Url::parse(endpoint) {
            errors.push(ValidationError::new(
                "secrets.endpoint",
                format!("invalid URL '{}': {}", endpoint, e),
            ));
        }
    }
    if secrets.cache_ttl_secs == 0 {
        errors.push(ValidationError::new("secrets.cache_ttl_secs", "must be > 0"));
    }
    if secrets.required.iter().any(|name| name.trim().is_empty()) {
        errors.push(ValidationError::new("secrets.required", "secret names must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
