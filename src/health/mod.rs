//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduled checks (monitor.rs):
//!     Periodic timer
//!     → probe the installed client
//!     → update state.rs
//!     → on failure with failures >= threshold: build, probe, swap client
//!
//! On-demand probes (monitor.rs):
//!     Health gate or retry loop
//!     → probe the installed client
//!     → update state.rs
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//! ```
//!
//! # Design Decisions
//! - One health verdict for the data store, not per request
//! - The client is replaced wholesale through an atomic swap, never patched
//! - Probe and recreation failures only change state; nothing here panics

pub mod monitor;
pub mod state;

pub use monitor::{HealthMonitor, RemoteClientHandle};
pub use state::HealthState;
