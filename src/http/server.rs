//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: `/health` plus the gated api surface
//! - Wire up middleware (request id, tracing, outer timeout)
//! - Serve on a listener until the shutdown signal, then drain

use axum::{error_handling::HandleErrorLayer, middleware, routing::get, BoxError, Router};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::trace::TraceLayer;

use crate::config::BffConfig;
use crate::http::{api, gate, health, request, ApiError};
use crate::lifecycle::shutdown;
use crate::lifecycle::Services;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

/// HTTP server for the BFF.
pub struct HttpServer {
    router: Router,
    config: BffConfig,
}

impl HttpServer {
    /// Create a new HTTP server over already-built services.
    pub fn new(config: BffConfig, services: Services) -> Self {
        let router = Self::build_router(&config, AppState { services });
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &BffConfig, state: AppState) -> Router {
        let api = api::routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::health_gate,
        ));
        let retry_after = Duration::from_secs(config.retries.retry_after_secs);

        Router::new()
            .route("/health", get(health::health_check))
            .nest(&config.listener.api_prefix, api)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(move |error: BoxError| async move {
                        deadline_error(error, retry_after)
                    }))
                    .layer(TimeoutLayer::new(config.request_deadline())),
            )
            .layer(request::propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request::make_span::<axum::body::Body>))
            .layer(request::set_request_id_layer())
    }

    /// A handle to the router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown_rx` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            api_prefix = %self.config.listener.api_prefix,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BffConfig {
        &self.config
    }
}

/// The outer deadline answers like any other availability failure.
fn deadline_error(error: BoxError, retry_after: Duration) -> ApiError {
    if error.is::<Elapsed>() {
        tracing::warn!("Request exceeded the outer deadline");
        ApiError::unavailable(
            "Database did not respond in time. Please try again later.",
            retry_after,
        )
    } else {
        tracing::error!(error = %error, "Unhandled middleware error");
        ApiError::unavailable("Service temporarily unavailable", retry_after)
    }
}
