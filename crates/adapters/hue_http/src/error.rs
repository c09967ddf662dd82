//! Hue adapter error types.

use huemqtt_domain::error::HueMqttError;

/// Gateway error type meaning the link button has not been pressed.
pub const LINK_BUTTON_NOT_PRESSED: u32 = 101;

/// Errors specific to the Hue adapter.
#[derive(Debug, thiserror::Error)]
pub enum HueError {
    /// Transport failure, timeout, or undecodable body.
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with an error entry.
    #[error("gateway error {kind}: {description}")]
    Api { kind: u32, description: String },

    /// The gateway answered with a body of unexpected shape.
    #[error("unexpected gateway response: {0}")]
    UnexpectedResponse(String),
}

impl HueError {
    /// Convert into a [`HueMqttError`] for propagation across port
    /// boundaries. A pairing refused for want of a button press keeps its
    /// own variant so the orchestrator can tell the user.
    pub fn into_domain(self) -> HueMqttError {
        match self {
            Self::Api {
                kind: LINK_BUTTON_NOT_PRESSED,
                ..
            } => HueMqttError::LinkButtonNotPressed,
            other => HueMqttError::Gateway(Box::new(other)),
        }
    }
}

impl From<HueError> for HueMqttError {
    fn from(err: HueError) -> Self {
        err.into_domain()
    }
}
