//! Remote data store client.
//!
//! # Responsibilities
//! - Define the opaque client surface the rest of the service depends on
//! - Issue requests against the store's HTTP API with timeouts and credentials
//! - Retry transient failures at the client layer with jittered backoff
//! - Map error statuses and bodies to `DataStoreError`

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::config::DataStoreConfig;
use crate::datastore::error::{DataStoreError, DataStoreResult};
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::classify::is_transient;

/// Operations the service issues against the remote data store.
///
/// Implementations are treated as immutable snapshots: the health monitor
/// replaces a broken client wholesale rather than repairing it in place.
#[async_trait]
pub trait DataStoreClient: Send + Sync + fmt::Debug {
    /// Cheap, side-effect-free liveness request. Single attempt.
    async fn probe(&self) -> DataStoreResult<()>;

    /// List up to `limit` table names.
    async fn list_tables(&self, limit: usize) -> DataStoreResult<Vec<String>>;

    /// Fetch one item by id.
    async fn get_item(&self, table: &str, id: &str) -> DataStoreResult<serde_json::Value>;
}

/// Credentials attached to every request.
#[derive(Clone, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    Static {
        access_key_id: String,
        secret_access_key: String,
    },
    Token(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => write!(f, "Anonymous"),
            Credentials::Static { access_key_id, .. } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .finish_non_exhaustive(),
            Credentials::Token(_) => write!(f, "Token(..)"),
        }
    }
}

#[derive(Deserialize)]
struct ListTablesResponse {
    #[serde(default)]
    tables: Vec<String>,
}

#[derive(Deserialize)]
struct GetItemResponse {
    item: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(alias = "__type")]
    code: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// HTTP implementation of [`DataStoreClient`].
pub struct HttpDataStoreClient {
    http: reqwest::Client,
    base: Url,
    region: String,
    credentials: Credentials,
    request_timeout: Duration,
    max_attempts: u32,
    backoff_base_ms: u64,
    backoff_max_ms: u64,
}

impl HttpDataStoreClient {
    /// Create a new client. No network traffic happens here.
    pub fn new(config: &DataStoreConfig, credentials: Credentials) -> DataStoreResult<Self> {
        let base: Url = config.endpoint.parse().map_err(|e| {
            DataStoreError::Build(format!("Invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(DataStoreError::Build(format!(
                "Endpoint '{}' cannot carry a path",
                config.endpoint
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| DataStoreError::Build(e.to_string()))?;

        Ok(Self {
            http,
            base,
            region: config.region.clone(),
            credentials,
            request_timeout: config.request_timeout(),
            max_attempts: config.max_attempts.max(1),
            backoff_base_ms: config.backoff_base_ms,
            backoff_max_ms: config.backoff_max_ms,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("x-datastore-region", &self.region);
        match &self.credentials {
            Credentials::Anonymous => builder,
            Credentials::Static {
                access_key_id,
                secret_access_key,
            } => builder.basic_auth(access_key_id, Some(secret_access_key)),
            Credentials::Token(token) => builder.bearer_auth(token),
        }
    }

    async fn send_once<T: DeserializeOwned>(&self, builder: RequestBuilder) -> DataStoreResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| DataStoreError::from_transport(e, self.request_timeout))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| DataStoreError::from_transport(e, self.request_timeout));
        }

        let body = response.text().await.unwrap_or_default();
        Err(remote_error(status, &body))
    }

    /// Send with client-layer retries on transient failures.
    async fn send<T, F>(&self, build: F) -> DataStoreResult<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(build()).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && is_transient(&e) => {
                    let delay = calculate_backoff(attempt, self.backoff_base_ms, self.backoff_max_ms);
                    tracing::debug!(attempt, delay = ?delay, error = %e, "Data store request failed, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl DataStoreClient for HttpDataStoreClient {
    async fn probe(&self) -> DataStoreResult<()> {
        let mut url = self.url(&["tables"]);
        url.query_pairs_mut().append_pair("limit", "1");
        self.send_once::<ListTablesResponse>(self.request(Method::GET, url))
            .await
            .map(|_| ())
    }

    async fn list_tables(&self, limit: usize) -> DataStoreResult<Vec<String>> {
        let mut url = self.url(&["tables"]);
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let response: ListTablesResponse = self.send(|| self.request(Method::GET, url.clone())).await?;
        Ok(response.tables)
    }

    async fn get_item(&self, table: &str, id: &str) -> DataStoreResult<serde_json::Value> {
        let url = self.url(&["tables", table, "items", id]);
        let response: GetItemResponse = self.send(|| self.request(Method::GET, url.clone())).await?;
        response.item.ok_or_else(|| DataStoreError::Remote {
            status: StatusCode::NOT_FOUND.as_u16(),
            code: Some("ResourceNotFoundException".to_string()),
            message: format!("No item '{}' in table '{}'", id, table),
        })
    }
}

impl fmt::Debug for HttpDataStoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDataStoreClient")
            .field("endpoint", &self.base.as_str())
            .field("region", &self.region)
            .field("credentials", &self.credentials)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// Build a `Remote` error from an error status and its (possibly empty) body.
fn remote_error(status: StatusCode, body: &str) -> DataStoreError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| {
        if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            body.trim().to_string()
        }
    });
    DataStoreError::Remote {
        status: status.as_u16(),
        code: parsed.code.map(|c| short_code(&c).to_string()),
        message,
    }
}

/// `com.example#ThrottlingException` → `ThrottlingException`.
fn short_code(code: &str) -> &str {
    code.rsplit('#').next().unwrap_or(code)
}
