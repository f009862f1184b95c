//! `GET /health` for load balancers and orchestrators.
//!
//! Reports the monitor's cached verdict and never probes, so a slow data store
//! cannot make the health endpoint itself slow. Not behind the gate.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBody {
    pub status: &'static str,
    pub timestamp: String,
    pub database: DatabaseStatus,
    /// Seconds since startup.
    pub uptime: u64,
    /// Resident set size in bytes, where the platform exposes it.
    pub memory: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    pub connected: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthBody>) {
    let snapshot = state.services.monitor.snapshot();
    let (status, code) = if snapshot.healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    let body = HealthBody {
        status,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        database: DatabaseStatus {
            connected: snapshot.healthy,
            last_check: snapshot.last_checked_at,
            consecutive_failures: snapshot.consecutive_failures,
        },
        uptime: state.services.started_at.elapsed().as_secs(),
        memory: resident_set_bytes().await,
    };
    (code, Json(body))
}

async fn resident_set_bytes() -> Option<u64> {
    let status = tokio::fs::read_to_string("/proc/self/status").await.ok()?;
    parse_vm_rss(&status)
}

/// Parse the `VmRSS:  1234 kB` line of `/proc/self/status`.
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    kib.checked_mul(1024)
}
