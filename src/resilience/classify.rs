//! Transient error classification.
//!
//! One closed decision table decides whether a failure is worth retrying.
//! Anything the table does not name is permanent: an unrecognized failure
//! fails fast instead of being retried on a guess.
//!
//! | Signal | Class |
//! |---|---|
//! | timeout, network failure | transient |
//! | remote error code in [`TRANSIENT_CODES`] | transient |
//! | remote status in [`TRANSIENT_STATUSES`] | transient |
//! | any other remote error (404, 400, 401, 403, 409, ...) | permanent |
//! | decode / construction failures | permanent |

use crate::datastore::DataStoreError;

/// Remote error codes that name a throttling or networking condition.
/// Matched exactly, never by substring.
pub const TRANSIENT_CODES: &[&str] = &[
    "ThrottlingException",
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "ServiceUnavailable",
    "InternalServerError",
    "RequestTimeout",
    "RequestTimeoutException",
    "TimeoutError",
    "NetworkingError",
];

/// HTTP statuses that indicate the store may recover on its own.
pub const TRANSIENT_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Retry verdict for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
}

/// Errors that can be sorted into [`ErrorClass`]es.
pub trait Classify {
    fn classify(&self) -> ErrorClass;

    fn is_transient(&self) -> bool {
        self.classify() == ErrorClass::Transient
    }
}

impl Classify for DataStoreError {
    fn classify(&self) -> ErrorClass {
        match self {
            DataStoreError::Timeout(_) | DataStoreError::Network(_) => ErrorClass::Transient,
            DataStoreError::Remote { status, code, .. } => {
                let named_transient = code
                    .as_deref()
                    .is_some_and(|c| TRANSIENT_CODES.contains(&c));
                if named_transient || TRANSIENT_STATUSES.contains(status) {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Permanent
                }
            }
            DataStoreError::Decode(_) | DataStoreError::Build(_) => ErrorClass::Permanent,
        }
    }
}

/// Shorthand for data store errors.
pub fn is_transient(err: &DataStoreError) -> bool {
    err.is_transient()
}
