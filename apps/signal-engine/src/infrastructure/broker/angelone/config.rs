//! AngelOne adapter configuration.

use std::time::Duration;

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://apiconnect.angelone.in";

/// Configuration for the AngelOne broker adapter.
#[derive(Debug, Clone)]
pub struct AngelOneConfig {
    /// SmartAPI application key, sent as `X-PrivateKey`.
    pub api_key: String,
    /// API base URL; overridable for tests.
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Value for the `X-ClientLocalIP` header.
    pub client_local_ip: String,
    /// Value for the `X-ClientPublicIP` header.
    pub client_public_ip: String,
    /// Value for the `X-MACAddress` header.
    pub mac_address: String,
}

impl AngelOneConfig {
    /// Configuration against the production host.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            client_local_ip: "127.0.0.1".to_string(),
            client_public_ip: "127.0.0.1".to_string(),
            mac_address: "00:00:00:00:00:00".to_string(),
        }
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
