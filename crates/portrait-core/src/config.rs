//! Configuration module
//!
//! Client settings are read from `PORTRAIT_`-prefixed environment variables
//! (a `.env` file is honored). Pipeline limits are constants, see
//! [`crate::constants`].

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

const ENV_PREFIX: &str = "PORTRAIT_";
const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const TRANSFER_TIMEOUT_SECS: u64 = 120;

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

fn default_transfer_timeout_secs() -> u64 {
    TRANSFER_TIMEOUT_SECS
}

/// Settings for talking to the profile API and the storage endpoint.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the profile API, including its `/api` prefix.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Timeout for calls to the profile API.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for the raw byte transfer to a signed URL.
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,
    /// Bearer token of the signed-in user, if the host already has one.
    #[serde(default)]
    pub token: Option<String>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("transfer_timeout_secs", &self.transfer_timeout_secs)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            transfer_timeout_secs: TRANSFER_TIMEOUT_SECS,
            token: None,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment (after reading `.env` if present).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::prefixed(ENV_PREFIX).from_env()?;
        config.validate()?;
        tracing::debug!(config = ?config, "Loaded client configuration");
        Ok(config)
    }

    /// Load from explicit key/value pairs (keys carry the `PORTRAIT_` prefix).
    pub fn from_vars<I>(vars: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "PORTRAIT_API_URL must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.request_timeout_secs == 0 || self.transfer_timeout_secs == 0 {
            return Err(AppError::Config(
                "Timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// API base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    /// The configured token, ignoring blank values.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
