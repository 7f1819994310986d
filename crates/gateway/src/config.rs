// crates/gateway/src/config.rs
use std::time::Duration;

/// Configuration for the HTTP gateway.
pub struct GatewayConfig {
    /// Base URL of the hosted backend (tables under /rest/v1, functions
    /// under /functions/v1).
    pub base_url: String,
    /// Project API key sent alongside the user token. None = omitted.
    pub api_key: Option<String>,
    /// Transport timeout. Retry policy lives in the cache layer, not here.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("GRANTSWIPE_API_URL")
                .unwrap_or_else(|_| "http://localhost:54321".to_string()),
            api_key: std::env::var("GRANTSWIPE_API_KEY").ok(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}
