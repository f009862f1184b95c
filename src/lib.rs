//! Community BFF resilience core
//!
//! Health supervision, retry coordination and cached secret access for a
//! backend-for-frontend sitting on a remote data store and a parameter store.

pub mod config;
pub mod datastore;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod secrets;

#[cfg(test)]
mod testing;

pub use config::schema::BffConfig;
pub use health::HealthMonitor;
pub use http::HttpServer;
pub use lifecycle::{Services, Shutdown};
pub use resilience::RetryCoordinator;
pub use secrets::SecretCache;
