/// Errors related to secret store operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SecretError {
    /// Secret not found
    #[error("Secret not found: {0}")]
    NotFound(String),

    /// Store answered with an error status
    #[error("Secret store returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error
    #[error("Request timeout")]
    Timeout,

    /// Unexpected response body
    #[error("Unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// The store cannot be written to
    #[error("Secret store '{0}' is read-only")]
    ReadOnly(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SecretError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::UnexpectedFormat(e.to_string())
        } else if e.is_builder() {
            Self::Config(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SecretError>;
