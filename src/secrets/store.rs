use super::{Result, SecretError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Trait for secret/parameter stores - the cache layers primary and fallback over it
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Short name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Read a value, decrypting it server-side when `decrypt` is set
    async fn get(&self, key: &str, decrypt: bool) -> Result<String>;

    /// Write a value, stored encrypted when `encrypt` is set
    async fn put(&self, key: &str, value: &str, encrypt: bool) -> Result<()>;
}

#[derive(Deserialize)]
struct ParameterEnvelope {
    parameter: Option<Parameter>,
    value: Option<String>,
}

#[derive(Deserialize)]
struct Parameter {
    value: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutParameter<'a> {
    value: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    overwrite: bool,
}

/// Managed parameter store reached over HTTP
pub struct HttpParameterStore {
    http: reqwest::Client,
    base: Url,
    api_token: Option<String>,
}

impl HttpParameterStore {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let base: Url = base_url
            .parse()
            .map_err(|e| SecretError::Config(format!("Invalid secret store URL '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(SecretError::Config(format!(
                "Secret store URL '{}' cannot carry a path",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SecretError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base,
            api_token,
        })
    }

    fn parameter_url(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["parameters", key]);
        }
        url
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn error_for_status(key: &str, response: reqwest::Response) -> SecretError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return SecretError::NotFound(key.to_string());
    }
    let message = response.text().await.unwrap_or_default();
    SecretError::Remote {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl SecretStore for HttpParameterStore {
    fn name(&self) -> &'static str {
        "parameter-store"
    }

    async fn get(&self, key: &str, decrypt: bool) -> Result<String> {
        let mut url = self.parameter_url(key);
        url.query_pairs_mut()
            .append_pair("withDecryption", if decrypt { "true" } else { "false" });

        let response = self.authorize(self.http.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(error_for_status(key, response).await);
        }

        let envelope: ParameterEnvelope = response.json().await?;
        envelope
            .parameter
            .map(|p| p.value)
            .or(envelope.value)
            .ok_or_else(|| SecretError::UnexpectedFormat(format!("no value for '{}'", key)))
    }

    async fn put(&self, key: &str, value: &str, encrypt: bool) -> Result<()> {
        let body = PutParameter {
            value,
            kind: if encrypt { "SecureString" } else { "String" },
            overwrite: true,
        };
        let response = self
            .authorize(self.http.put(self.parameter_url(key)))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_for_status(key, response).await);
        }
        tracing::debug!(key, "Parameter written");
        Ok(())
    }
}

/// Environment variable-based store (fallback)
///
/// `payment/stripe-secret-key` is read from `PAYMENT_STRIPE_SECRET_KEY`.
#[derive(Debug, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    pub fn var_name(key: &str) -> String {
        key.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn get(&self, key: &str, _decrypt: bool) -> Result<String> {
        let var = Self::var_name(key);
        std::env::var(&var).map_err(|_| {
            tracing::debug!("Secret '{}' not found in environment variable {}", key, var);
            SecretError::NotFound(key.to_string())
        })
    }

    async fn put(&self, _key: &str, _value: &str, _encrypt: bool) -> Result<()> {
        Err(SecretError::ReadOnly(self.name()))
    }
}
