//! Inbound health gate for data-access routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::resilience::Admission;

/// Admit the request unless the data store is down and one probe confirms it.
///
/// A rejected request never reaches its handler.
pub async fn health_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match state.services.coordinator.admit().await {
        Admission::Admitted | Admission::Restored => next.run(request).await,
        Admission::Rejected { retry_after } => {
            tracing::warn!(
                path = %request.uri().path(),
                consecutive_failures = state.services.monitor.consecutive_failure_count(),
                "Rejecting request, data store unavailable"
            );
            ApiError::unavailable(
                "Database temporarily unavailable. Please try again later.",
                retry_after,
            )
            .into_response()
        }
    }
}
