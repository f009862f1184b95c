//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bff_datastore_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `bff_datastore_consecutive_failures` (gauge): current failure streak
//! - `bff_datastore_probes_total` (counter): probes by result
//! - `bff_datastore_recreations_total` (counter): client rebuilds by result
//! - `bff_retry_attempts_total` (counter): retry loop outcomes
//! - `bff_gate_rejections_total` (counter): requests refused by the health gate
//! - `bff_secret_lookups_total` (counter): secret reads by serving source
//!
//! Recording without an installed exporter is a no-op, so unit tests need no setup.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::health::HealthState;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn result_label(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

pub fn record_probe(ok: bool) {
    counter!("bff_datastore_probes_total", "result" => result_label(ok)).increment(1);
}

pub fn record_recreation(ok: bool) {
    counter!("bff_datastore_recreations_total", "result" => result_label(ok)).increment(1);
}

pub fn record_datastore_health(state: &HealthState) {
    gauge!("bff_datastore_healthy").set(if state.healthy { 1.0 } else { 0.0 });
    gauge!("bff_datastore_consecutive_failures").set(f64::from(state.consecutive_failures));
}

/// `outcome` is one of recovered, permanent, exhausted, retried.
pub fn record_retry_outcome(outcome: &'static str) {
    counter!("bff_retry_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_gate_rejection() {
    counter!("bff_gate_rejections_total").increment(1);
}

/// `source` is one of cache, primary, fallback.
pub fn record_secret_lookup(source: &'static str) {
    counter!("bff_secret_lookups_total", "source" => source).increment(1);
}
