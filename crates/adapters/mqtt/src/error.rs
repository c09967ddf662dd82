//! MQTT adapter error types.

use huemqtt_domain::error::HueMqttError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The broker connection is down.
    #[error("MQTT client not connected")]
    NotConnected,

    /// The rumqttc client rejected the request.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into a [`HueMqttError::Bus`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> HueMqttError {
        HueMqttError::Bus(Box::new(self))
    }
}

impl From<MqttError> for HueMqttError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}

impl From<rumqttc::ClientError> for MqttError {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::Client(err)
    }
}
