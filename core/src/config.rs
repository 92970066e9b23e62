//! Client configuration.

use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REFRESH_PATH: &str = "/auth/token";

pub const BASE_URL_ENV: &str = "ROOME_API_BASE_URL";
pub const TIMEOUT_ENV: &str = "ROOME_HTTP_TIMEOUT_SECS";

/// Where the roome API lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    refresh_path: String,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read `ROOME_API_BASE_URL` and, optionally, `ROOME_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = std::env::var(BASE_URL_ENV)
            .map_err(|_| ApiError::Config(format!("{BASE_URL_ENV} is not set")))?;
        let mut config = Self::new(&base_url);
        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ApiError::Config(format!("invalid {TIMEOUT_ENV}: {e}")))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_refresh_path(mut self, path: &str) -> Self {
        self.refresh_path = format!("/{}", path.trim_start_matches('/'));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn refresh_url(&self) -> String {
        self.url(&self.refresh_path)
    }
}
