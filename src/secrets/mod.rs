//! Secret access subsystem.
//!
//! # Data Flow
//! ```text
//! Route handler or client factory
//!     → manager.rs (cache lookup keyed by name and decrypt flag)
//!     → store.rs primary (HTTP parameter store)
//!     → store.rs fallback (environment variables)
//! ```
//!
//! # Design Decisions
//! - Secret values never reach logs, only key names
//! - Entries expire after a fixed TTL and are evicted on lookup
//! - The environment store is read-only

pub mod cache;
pub mod error;
pub mod manager;
pub mod store;

pub use cache::ExpiringCache;
pub use error::{Result, SecretError};
pub use manager::SecretCache;
pub use store::{EnvSecretStore, HttpParameterStore, SecretStore};
