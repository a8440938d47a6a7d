use crate::error::{ClientError, Result};
use std::fmt;
use std::time::Duration;

pub const API_URL_ENV: &str = "CONVOQ_API_URL";
pub const AUTH_TOKEN_ENV: &str = "CONVOQ_AUTH_TOKEN";
pub const TIMEOUT_ENV: &str = "CONVOQ_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Bearer token sent on every request. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    token: String,
}

impl AuthToken {
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        let token = raw.trim();
        if token.is_empty() {
            return Err(ClientError::invalid_config("auth token must be non-empty"));
        }

        Ok(Some(Self {
            token: token.to_string(),
        }))
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth_token: Option<AuthToken>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys fall back to
    /// the defaults; set-but-invalid keys are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL_ENV) {
            config.base_url = url;
        }
        config.auth_token = AuthToken::parse(lookup(AUTH_TOKEN_ENV).as_deref())?;
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::invalid_config(format!(
                    "{TIMEOUT_ENV} must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_auth_token(mut self, token: Option<AuthToken>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ClientError::invalid_config("API URL must be non-empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::invalid_config(format!(
                "API URL must start with http:// or https://, got {url:?}"
            )));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::invalid_config("timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Joins `path` onto the base URL without doubling the slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
