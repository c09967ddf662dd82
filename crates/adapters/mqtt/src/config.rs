//! MQTT broker configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the broker connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    pub server: String,
    /// Broker port.
    pub port: u16,
    /// Optional user name; the password is only sent alongside it.
    pub login: Option<String>,
    pub password: Option<String>,
    /// Connect over TLS with the platform's root certificates.
    pub use_tls: bool,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Prefix of every published topic.
    pub base_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 1883,
            login: None,
            password: None,
            use_tls: false,
            client_id: "huemqtt".to_string(),
            keep_alive_secs: 30,
            base_topic: "homie".to_string(),
        }
    }
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }
}
