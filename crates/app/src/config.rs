//! Runtime settings of the gateway link, already validated by the caller.

use std::time::Duration;

use huemqtt_domain::credential::PairingCredential;

/// Application name sent in the pairing `devicetype`.
pub const APP_NAME: &str = "huemqtt";

/// Fixed delay between attempts of a failed step.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// What the orchestrator needs to find, pair with, and mirror a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Query the network when no gateway address is configured.
    pub discover: bool,
    pub gateway_address: Option<String>,
    pub username: Option<String>,
    pub client_key: Option<String>,
    /// Sent as the device part of the pairing `devicetype`.
    pub client_id: String,
    pub polling_interval: Duration,
    /// Topic prefix of every published message.
    pub base_topic: String,
    /// Log every publish at `info` instead of `trace`.
    pub debug: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            discover: true,
            gateway_address: None,
            username: None,
            client_key: None,
            client_id: APP_NAME.to_string(),
            polling_interval: Duration::from_secs(2),
            base_topic: "homie".to_string(),
            debug: false,
        }
    }
}

impl LinkConfig {
    /// The stored credential, when address, user name and key are all known.
    #[must_use]
    pub fn credential(&self) -> Option<PairingCredential> {
        self.credential_for(&self.address()?)
    }

    /// The configured user name and key, bound to `address`.
    #[must_use]
    pub fn credential_for(&self, address: &str) -> Option<PairingCredential> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        Some(PairingCredential {
            gateway_address: address.to_string(),
            username: non_empty(&self.username)?,
            client_key: non_empty(&self.client_key)?,
            client_id: self.client_id.clone(),
        })
    }

    /// The configured gateway address, ignoring blanks.
    #[must_use]
    pub fn address(&self) -> Option<String> {
        self.gateway_address.clone().filter(|a| !a.is_empty())
    }
}
