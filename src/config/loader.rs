//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::BffConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => {
                write!(f, "Environment variable {} has invalid value '{}'", var, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: defaults, then the optional TOML file, then environment
/// overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<BffConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => BffConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment-style inputs onto `config`.
///
/// `lookup` is injected so tests can supply variables without touching the
/// process environment.
pub fn apply_env_overrides<F>(config: &mut BffConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("BFF_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("BFF_DATA_STORE_ENDPOINT") {
        config.data_store.endpoint = v;
    }
    if let Some(v) = lookup("BFF_REGION") {
        config.data_store.region = v;
    }
    if let Some(v) = lookup("BFF_ACCESS_KEY_ID") {
        config.data_store.access_key_id = Some(v);
    }
    if let Some(v) = lookup("BFF_SECRET_ACCESS_KEY") {
        config.data_store.secret_access_key = Some(v);
    }
    if let Some(v) = lookup("BFF_CREDENTIALS_SECRET") {
        config.data_store.credentials_secret = Some(v);
    }
    if let Some(v) = lookup("BFF_SECRETS_ENDPOINT") {
        config.secrets.endpoint = Some(v);
    }
    if let Some(v) = lookup("BFF_SECRETS_TOKEN") {
        config.secrets.api_token = Some(v);
    }
    if let Some(v) = lookup("BFF_LOG_LEVEL") {
        config.observability.log_level = v;
    }

    override_parsed(&lookup, "BFF_CLIENT_MAX_ATTEMPTS", &mut config.data_store.max_attempts)?;
    override_parsed(&lookup, "BFF_REQUEST_TIMEOUT_SECS", &mut config.data_store.request_timeout_secs)?;
    override_parsed(&lookup, "BFF_CONNECT_TIMEOUT_SECS", &mut config.data_store.connect_timeout_secs)?;
    override_parsed(&lookup, "BFF_HEALTH_INTERVAL_SECS", &mut config.health_check.interval_secs)?;
    override_parsed(&lookup, "BFF_FAILURE_THRESHOLD", &mut config.health_check.failure_threshold)?;
    override_parsed(&lookup, "BFF_RETRY_MAX_ATTEMPTS", &mut config.retries.max_attempts)?;
    override_parsed(&lookup, "BFF_RETRY_DELAY_MS", &mut config.retries.delay_ms)?;
    override_parsed(&lookup, "BFF_SECRET_CACHE_TTL_SECS", &mut config.secrets.cache_ttl_secs)?;

    Ok(())
}

fn override_parsed<F, T>(lookup: &F, var: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(var) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { var, value })?;
    }
    Ok(())
}
