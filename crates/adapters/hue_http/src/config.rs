//! HTTP client configuration.

use std::time::Duration;

use serde::Deserialize;

/// Public discovery endpoint listing gateways registered from this network.
pub const DEFAULT_DISCOVERY_URL: &str = "https://discovery.meethue.com";

/// Configuration of the REST client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HueHttpConfig {
    /// Where `discover` looks for gateways.
    pub discovery_url: String,
    /// Timeout applied to every request, in seconds.
    pub timeout_secs: u64,
}

impl Default for HueHttpConfig {
    fn default() -> Self {
        Self {
            discovery_url: DEFAULT_DISCOVERY_URL.to_string(),
            timeout_secs: 5,
        }
    }
}

impl HueHttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
