//! Configuration loading from a TOML file with environment variable overrides.
//!
//! The file path comes from the command line (default `huemqtt.toml`). Every
//! field has a sensible default so the file is optional. Environment
//! variables take precedence over file values, and a credential saved by an
//! earlier pairing fills in the gateway when the file names none.

use std::path::Path;
use std::time::Duration;

use huemqtt_adapter_hue::HueHttpConfig;
use huemqtt_adapter_mqtt::MqttConfig;
use huemqtt_app::config::{APP_NAME, LinkConfig};
use serde::Deserialize;

use crate::credentials::{CredentialError, FileCredentialStore, SavedCredential};

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "huemqtt.toml";

const DEFAULT_LOG_FILTER: &str = "huemqttd=info,huemqtt=info";
const DEBUG_LOG_FILTER: &str = "huemqtt=debug,huemqttd=debug";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection and topic prefix.
    pub mqtt: MqttConfig,
    /// Gateway discovery, pairing and polling.
    pub hue: HueConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Gateway settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HueConfig {
    /// Look for a gateway on the network when `gateway` is empty.
    pub discover: bool,
    /// Gateway address; empty means unknown.
    pub gateway: String,
    pub username: String,
    pub client_key: String,
    /// Device part of the pairing `devicetype`.
    pub client_id: String,
    /// Seconds between two poll passes.
    pub polling_interval: u64,
    /// REST client settings (`discovery_url`, `timeout_secs`).
    #[serde(flatten)]
    pub http: HueHttpConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
    /// Raise the default filter to `debug` and log every published value.
    pub debug: bool,
}

impl Config {
    /// Load configuration from `path` (if present), apply environment
    /// overrides, then fill the gateway from the saved credential next to
    /// the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or the saved credential exists but is
    /// malformed, or if the result fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load), reading overrides from `lookup` instead
    /// of the process environment.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(lookup);
        if config.hue.gateway.is_empty() {
            if let Some(saved) = FileCredentialStore::beside(path).load()? {
                config.apply_saved(saved);
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("HUEMQTT_MQTT_SERVER") {
            self.mqtt.server = val;
        }
        if let Some(val) = lookup("HUEMQTT_MQTT_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.port = port;
            }
        }
        if let Some(val) = lookup("HUEMQTT_MQTT_LOGIN") {
            self.mqtt.login = Some(val);
        }
        if let Some(val) = lookup("HUEMQTT_MQTT_PASSWORD") {
            self.mqtt.password = Some(val);
        }
        if let Some(val) = lookup("HUEMQTT_HUE_GATEWAY") {
            self.hue.gateway = val;
        }
        if let Some(val) = lookup("HUEMQTT_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if self.mqtt.login.as_deref() == Some("") {
            self.mqtt.login = None;
            self.mqtt.password = None;
        }
    }

    fn apply_saved(&mut self, saved: SavedCredential) {
        tracing::debug!(gateway = %saved.gateway, "using saved gateway credential");
        self.hue.gateway = saved.gateway;
        self.hue.username = saved.username;
        self.hue.client_key = saved.client_key;
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.port == 0 {
            return Err(ConfigError::Validation(
                "mqtt port must be non-zero".to_string(),
            ));
        }
        if self.hue.polling_interval == 0 {
            return Err(ConfigError::Validation(
                "polling interval must be non-zero".to_string(),
            ));
        }
        if !self.hue.discover && self.hue.gateway.is_empty() {
            return Err(ConfigError::Validation(
                "Disabled discover and no gateway specified".to_string(),
            ));
        }
        Ok(())
    }

    /// The filter handed to `tracing-subscriber`.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        if self.logging.debug && self.logging.filter == DEFAULT_LOG_FILTER {
            DEBUG_LOG_FILTER
        } else {
            &self.logging.filter
        }
    }

    /// Runtime settings of the gateway link.
    #[must_use]
    pub fn link_config(&self) -> LinkConfig {
        let optional = |value: &str| Some(value.to_string()).filter(|v| !v.is_empty());
        LinkConfig {
            discover: self.hue.discover,
            gateway_address: optional(&self.hue.gateway),
            username: optional(&self.hue.username),
            client_key: optional(&self.hue.client_key),
            client_id: self.hue.client_id.clone(),
            polling_interval: Duration::from_secs(self.hue.polling_interval),
            base_topic: self.mqtt.base_topic.clone(),
            debug: self.logging.debug,
        }
    }
}

impl Default for HueConfig {
    fn default() -> Self {
        Self {
            discover: true,
            gateway: String::new(),
            username: String::new(),
            client_key: String::new(),
            client_id: APP_NAME.to_string(),
            polling_interval: 2,
            http: HueHttpConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            debug: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// The saved pairing credential could not be read.
    #[error("failed to read saved credential")]
    Credentials(#[from] CredentialError),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.mqtt.server, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert!(config.hue.discover);
        assert!(config.hue.gateway.is_empty());
        assert_eq!(config.hue.client_id, "huemqtt");
        assert_eq!(config.hue.polling_interval, 2);
        assert_eq!(config.logging.filter, "huemqttd=info,huemqtt=info");
        assert!(!config.logging.debug);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.hue.http.discovery_url, "https://discovery.meethue.com");
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [mqtt]
            server = 'broker.lan'
            port = 8883
            login = 'bridge'
            password = 'secret'
            use_tls = true
            base_topic = 'devices'

            [hue]
            discover = false
            gateway = '192.168.1.2'
            username = 'user'
            client_key = 'key'
            client_id = 'attic'
            polling_interval = 10
            timeout_secs = 3

            [logging]
            filter = 'trace'
            debug = true
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.mqtt.server, "broker.lan");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.login.as_deref(), Some("bridge"));
        assert!(config.mqtt.use_tls);
        assert!(!config.hue.discover);
        assert_eq!(config.hue.gateway, "192.168.1.2");
        assert_eq!(config.hue.client_id, "attic");
        assert_eq!(config.hue.polling_interval, 10);
        assert_eq!(config.hue.http.timeout_secs, 3);
        assert_eq!(config.logging.filter, "trace");
        assert!(config.logging.debug);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file(Path::new("nonexistent.toml")).unwrap();
        assert_eq!(config.mqtt.port, 1883);
    }

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn should_apply_overrides_over_file_values() {
        let mut config = Config::default();
        config.apply_overrides(lookup_in(&[
            ("HUEMQTT_MQTT_SERVER", "broker.lan"),
            ("HUEMQTT_MQTT_PORT", "8883"),
            ("HUEMQTT_MQTT_LOGIN", "bridge"),
            ("HUEMQTT_MQTT_PASSWORD", "secret"),
            ("HUEMQTT_HUE_GATEWAY", "10.0.0.5"),
            ("HUEMQTT_LOG", "debug"),
        ]));

        assert_eq!(config.mqtt.server, "broker.lan");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.login.as_deref(), Some("bridge"));
        assert_eq!(config.mqtt.password.as_deref(), Some("secret"));
        assert_eq!(config.hue.gateway, "10.0.0.5");
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_let_rust_log_win_and_ignore_bad_port() {
        let mut config = Config::default();
        config.apply_overrides(lookup_in(&[
            ("HUEMQTT_LOG", "debug"),
            ("RUST_LOG", "trace"),
            ("HUEMQTT_MQTT_PORT", "not-a-port"),
        ]));

        assert_eq!(config.logging.filter, "trace");
        assert_eq!(config.mqtt.port, 1883);
    }

    #[test]
    fn should_drop_blank_login() {
        let mut config = Config::default();
        config.apply_overrides(lookup_in(&[
            ("HUEMQTT_MQTT_LOGIN", ""),
            ("HUEMQTT_MQTT_PASSWORD", "secret"),
        ]));

        assert!(config.mqtt.login.is_none());
        assert!(config.mqtt.password.is_none());
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.mqtt.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_polling_interval() {
        let mut config = Config::default();
        config.hue.polling_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_disabled_discovery_without_gateway() {
        let mut config = Config::default();
        config.hue.discover = false;

        let err = config.validate().unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Validation(ref message) if message == "Disabled discover and no gateway specified"
        ));
    }

    #[test]
    fn should_accept_disabled_discovery_with_gateway() {
        let mut config = Config::default();
        config.hue.discover = false;
        config.hue.gateway = "192.168.1.2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_switch_default_filter_to_debug() {
        let mut config = Config::default();
        config.logging.debug = true;
        assert_eq!(config.log_filter(), "huemqtt=debug,huemqttd=debug");

        config.logging.filter = "warn".to_string();
        assert_eq!(config.log_filter(), "warn");
    }

    #[test]
    fn should_build_link_config_without_blank_fields() {
        let mut config = Config::default();
        config.hue.gateway = "192.168.1.2".to_string();
        config.hue.username = "user".to_string();
        config.hue.polling_interval = 7;
        config.mqtt.base_topic = "devices".to_string();

        let link = config.link_config();

        assert_eq!(link.gateway_address.as_deref(), Some("192.168.1.2"));
        assert_eq!(link.username.as_deref(), Some("user"));
        assert!(link.client_key.is_none());
        assert_eq!(link.polling_interval, Duration::from_secs(7));
        assert_eq!(link.base_topic, "devices");
        assert!(link.credential().is_none());
    }

    #[test]
    fn should_fill_gateway_from_saved_credential() {
        let mut config = Config::default();
        config.apply_saved(SavedCredential {
            gateway: "192.168.1.9".to_string(),
            username: "saved".to_string(),
            client_key: "KEY".to_string(),
        });

        let credential = config.link_config().credential().unwrap();

        assert_eq!(credential.gateway_address, "192.168.1.9");
        assert_eq!(credential.username, "saved");
        assert_eq!(credential.client_key, "KEY");
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
