//! Shared HTTP client configuration for every outbound adapter.

use reqwest::Client;
use std::time::Duration;

/// Transport settings. The engine enforces no timeout of its own, so these
/// bound how long a single handler call can hang.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(30),
            user_agent: format!("package_updates/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub fn build_client(config: &HttpConfig) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .build()
}
