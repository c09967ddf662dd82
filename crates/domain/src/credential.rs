//! Pairing credentials obtained from the gateway.

use std::fmt;

/// Long-lived credential produced by a successful pairing handshake.
///
/// Persisting it is the job of a `CredentialSink`; the link only keeps it in
/// memory.
#[derive(Clone, PartialEq, Eq)]
pub struct PairingCredential {
    /// Network address of the paired gateway.
    pub gateway_address: String,
    /// Whitelisted user name issued by the gateway.
    pub username: String,
    /// Client key issued alongside the user name.
    pub client_key: String,
    /// Locally chosen client identifier sent during pairing.
    pub client_id: String,
}

impl fmt::Debug for PairingCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingCredential")
            .field("gateway_address", &self.gateway_address)
            .field("username", &self.username)
            .field("client_key", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish()
    }
}
