//! Data store health state machine.
//!
//! # States
//! - Healthy: data-access requests are admitted without probing
//! - Unhealthy: the gate probes before admitting; the scheduled loop
//!   recreates the client once failures reach the threshold
//!
//! # State Transitions
//! ```text
//! Healthy   → Unhealthy: any failed probe
//! Unhealthy → Healthy:   a successful probe or a successful recreation
//! ```
//!
//! # Design Decisions
//! - No hysteresis: one success clears the failure count
//! - Readers take a copy under a short read lock, never a reference
//! - Only the health monitor holds the write side

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{PoisonError, RwLock};

/// Snapshot of the data store's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthState {
    pub healthy: bool,
    pub consecutive_failures: u32,
    /// `None` until the first probe completes.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl HealthState {
    /// State at process start: optimistic until the first probe says otherwise.
    pub fn initial() -> Self {
        Self {
            healthy: true,
            consecutive_failures: 0,
            last_checked_at: None,
        }
    }

    pub(crate) fn record_success(&mut self, at: DateTime<Utc>) {
        self.healthy = true;
        self.consecutive_failures = 0;
        self.last_checked_at = Some(at);
    }

    pub(crate) fn record_failure(&mut self, at: DateTime<Utc>) {
        self.healthy = false;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_checked_at = Some(at);
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Thread-safe cell holding the current [`HealthState`].
#[derive(Debug, Default)]
pub struct SharedHealth {
    inner: RwLock<HealthState>,
}

impl SharedHealth {
    pub fn new(state: HealthState) -> Self {
        Self {
            inner: RwLock::new(state),
        }
    }

    pub fn snapshot(&self) -> HealthState {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` atomically and return the states before and after.
    pub(crate) fn update<F>(&self, f: F) -> (HealthState, HealthState)
    where
        F: FnOnce(&mut HealthState),
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = *guard;
        f(&mut guard);
        (before, *guard)
    }
}
