//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request id, request span)
//!     → /health → health.rs (cached verdict, never gated)
//!     → /api/*  → gate.rs (admit, or 503 with retryAfter)
//!               → api.rs (retry-wrapped data store calls)
//!     → response.rs (structured JSON errors)
//! ```

pub mod api;
pub mod gate;
pub mod health;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
