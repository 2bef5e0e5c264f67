use std::fmt;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ClientError;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_API_URL: &str = "HOOKQ_API_URL";
pub const ENV_API_TOKEN: &str = "HOOKQ_API_TOKEN";
pub const ENV_TIMEOUT_MS: &str = "HOOKQ_TIMEOUT_MS";

/// Configuration for [`crate::HookqClient`]
pub struct HookqClientConfig {
    /// Base API URL, e.g. `https://hookq.example.com/v1`.
    pub base_url: String,
    /// Bearer token sent on every call.
    pub token: SecretString,
    /// Absolute limit for a single call, including reading the body.
    pub timeout: Duration,
}

impl HookqClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: SecretString::from(token.into()),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Create configuration from environment variables
    ///
    /// Expects:
    /// - `HOOKQ_API_URL`: base API URL (required)
    /// - `HOOKQ_API_TOKEN`: bearer token (required)
    /// - `HOOKQ_TIMEOUT_MS`: request timeout in milliseconds (default 30000)
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] when a required variable is unset
    /// or the timeout is not an integer.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = required_var(ENV_API_URL)?;
        let token = required_var(ENV_API_TOKEN)?;
        let config = Self::new(base_url, token);

        match std::env::var(ENV_TIMEOUT_MS) {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(timeout_ms) => Ok(config.with_timeout_ms(timeout_ms)),
                Err(_) => Err(ClientError::validation(format!(
                    "{ENV_TIMEOUT_MS} must be an integer, got `{raw}`"
                ))),
            },
            Err(_) => Ok(config),
        }
    }

    /// Rejects a missing base URL or token before any I/O.
    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        use secrecy::ExposeSecret;

        if self.base_url.trim().is_empty() {
            return Err(ClientError::validation("API base URL is required"));
        }
        if self.token.expose_secret().is_empty() {
            return Err(ClientError::validation("API token is required"));
        }
        Ok(())
    }
}

impl fmt::Debug for HookqClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookqClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn required_var(name: &str) -> Result<String, ClientError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ClientError::validation(format!("{name} not set")))
}
