//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! health, resilience and secrets produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout (human or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every request span
//! - Secret values are never logged

pub mod logging;
pub mod metrics;
