//! Connection state of the gateway link.

use std::fmt;

/// Where the pairing/connection orchestrator currently stands.
///
/// Only the orchestrator mutates this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Nothing evaluated yet, or the sequence was restarted.
    #[default]
    Unpaired,
    /// No gateway address known; querying the network.
    Discovering,
    /// Address known but no credential; waiting for the link button.
    AwaitingButtonPress,
    /// Address and credential known, no live session.
    PairedDisconnected,
    /// Session verified, devices published, poll loop running.
    Connected,
}

impl ConnectionState {
    /// Whether the link is operational.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unpaired => f.write_str("unpaired"),
            Self::Discovering => f.write_str("discovering"),
            Self::AwaitingButtonPress => f.write_str("awaiting-button-press"),
            Self::PairedDisconnected => f.write_str("paired-disconnected"),
            Self::Connected => f.write_str("connected"),
        }
    }
}
