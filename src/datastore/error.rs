//! Data store error definitions.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during data store operations.
#[derive(Debug, Clone, Error)]
pub enum DataStoreError {
    /// The request did not complete within its deadline.
    #[error("Data store request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection could not be established or was dropped mid-request.
    #[error("Network error: {0}")]
    Network(String),

    /// The store answered with an error status.
    #[error("Data store returned {status}: {message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// A client could not be constructed.
    #[error("Client construction failed: {0}")]
    Build(String),
}

impl DataStoreError {
    pub fn status(&self) -> Option<u16> {
        match self {
            DataStoreError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl DataStoreError {
    /// Map a transport error, attributing timeouts to `deadline`.
    pub(crate) fn from_transport(e: reqwest::Error, deadline: Duration) -> Self {
        if e.is_timeout() {
            DataStoreError::Timeout(deadline)
        } else if e.is_decode() {
            DataStoreError::Decode(e.to_string())
        } else if e.is_builder() {
            DataStoreError::Build(e.to_string())
        } else {
            DataStoreError::Network(e.to_string())
        }
    }
}

/// Result type for data store operations.
pub type DataStoreResult<T> = Result<T, DataStoreError>;
