//! API client configuration.
//!
//! Defaults point at the public OpenCNPJ endpoint. Override through
//! environment variables or explicit construction (tests point the base URL
//! at a local mock server).

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.opencnpj.org";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Whole-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            user_agent: format!("cnpjfy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CNPJFY_API_BASE_URL` (default: `https://api.opencnpj.org`)
    /// - `CNPJFY_API_TIMEOUT_SECS` (default: no timeout; ignored unless a
    ///   positive integer)
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("CNPJFY_API_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config = config.with_base_url(url.trim());
        }
        config.timeout = lookup("CNPJFY_API_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);
        config
    }
}
