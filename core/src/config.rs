//! Runner configuration.
//!
//! Passed explicitly into `ContractRunner::new`; there is no process-wide
//! base URL, so runners for different environments can coexist.

use std::time::Duration;

use crate::error::ContractError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    /// Prefix for relative request URLs. Trailing slashes are ignored.
    pub base_url: String,
    /// Upper bound on waiting for a complete response.
    pub timeout: Duration,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ContractConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URLs pass through; relative ones are joined to `base_url`.
    pub fn resolve(&self, url: &str) -> Result<String, ContractError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        if self.base_url.is_empty() {
            return Err(ContractError::InvalidRequest(format!(
                "relative url `{url}` with no base url configured"
            )));
        }
        let path = url.trim_start_matches('/');
        Ok(format!("{}/{path}", self.base_url))
    }
}
