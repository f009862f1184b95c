//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound data-access request:
//!     → retries.rs RetryCoordinator::admit (health gate, one restoration probe)
//!     → handler calls RetryCoordinator::run_with_retry
//!         → classify.rs decides transient vs permanent
//!         → transient: fixed delay, out-of-band probe, next attempt
//!         → permanent / exhausted: error returned unchanged
//!
//! Inside the HTTP data store client:
//!     → backoff.rs jittered exponential delay between client-layer attempts
//! ```
//!
//! # Design Decisions
//! - One closed classification table; unknown failures are not retried
//! - Attempts for one logical operation are strictly sequential
//! - The coordinator never repairs the client itself; it asks the monitor

pub mod backoff;
pub mod classify;
pub mod retries;

pub use classify::{Classify, ErrorClass};
pub use retries::{run_with_retry, Admission, RetryCoordinator, RetryPolicy};
