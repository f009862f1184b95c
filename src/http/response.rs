//! Structured JSON error responses.
//!
//! Every error leaves as `{error, message, timestamp}`; availability failures
//! add `retryAfter` in the body and a `Retry-After` header, both in seconds.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::datastore::DataStoreError;
use crate::resilience::Classify;
use crate::secrets::SecretError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The data store or a required secret is unavailable right now.
    #[error("{message}")]
    Unavailable { message: String, retry_after: Duration },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// The data store failed in a way retrying will not fix.
    #[error("{0}")]
    BadGateway(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn unavailable(message: impl Into<String>, retry_after: Duration) -> Self {
        Self::Unavailable {
            message: message.into(),
            retry_after,
        }
    }

    /// Map a data store error that survived the retry loop.
    pub fn from_datastore(error: DataStoreError, retry_after: Duration) -> Self {
        if error.is_transient() {
            return Self::unavailable(
                format!("Database temporarily unavailable: {}", error),
                retry_after,
            );
        }
        match error.status() {
            Some(404) => Self::NotFound(error.to_string()),
            Some(400) => Self::BadRequest(error.to_string()),
            // 401/403 mean the store refused our credentials, not the caller's
            _ => Self::BadGateway(error.to_string()),
        }
    }

    /// Secrets that cannot be read are an availability problem for the caller.
    pub fn from_secret(error: SecretError, retry_after: Duration) -> Self {
        tracing::error!(error = %error, "Secret lookup failed");
        Self::unavailable("Service configuration temporarily unavailable", retry_after)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            Self::Unavailable { retry_after, .. } => Some(retry_after.as_secs()),
            _ => None,
        };

        let body = ErrorBody {
            error: status.canonical_reason().unwrap_or("Error"),
            message: self.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
