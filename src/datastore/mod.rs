//! Remote data store subsystem.
//!
//! # Data Flow
//! ```text
//! Business code / health probes
//!     → DataStoreClient (client.rs, opaque trait object)
//!     → HttpDataStoreClient (timeouts, credentials, client-layer retries)
//!     → remote store HTTP API
//!
//! Recreation (health monitor):
//!     → ClientFactory::build (factory.rs)
//!     → credentials from config or the secret cache
//!     → brand-new client, swapped in only after it passes a probe
//! ```

pub mod client;
pub mod error;
pub mod factory;

pub use client::{Credentials, DataStoreClient, HttpDataStoreClient};
pub use error::{DataStoreError, DataStoreResult};
pub use factory::{ClientFactory, HttpClientFactory};
