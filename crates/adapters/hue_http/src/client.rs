//! reqwest-based gateway client and session.

use huemqtt_app::ports::{GatewayClient, GatewaySession, StatePatch};
use huemqtt_domain::credential::PairingCredential;
use huemqtt_domain::device::{DeviceType, GatewayDevice};
use huemqtt_domain::error::HueMqttError;
use serde_json::{Value, json};

use crate::config::HueHttpConfig;
use crate::error::HueError;
use crate::wire::{self, DiscoveryEntry};

/// `http://` is assumed when the address carries no scheme.
fn base_url(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.trim_end_matches('/').to_string()
    } else {
        format!("http://{address}")
    }
}

/// Unauthenticated client, shared by every session it opens.
#[derive(Debug, Clone)]
pub struct HueClient {
    http: reqwest::Client,
    config: HueHttpConfig,
}

impl HueClient {
    /// Build a client whose requests all time out after
    /// [`HueHttpConfig::timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`HueError::Http`] when the TLS backend cannot be initialised.
    pub fn new(config: HueHttpConfig) -> Result<Self, HueError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, config })
    }

    async fn discover_addresses(&self) -> Result<Vec<String>, HueError> {
        let entries: Vec<DiscoveryEntry> = self
            .http
            .get(&self.config.discovery_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| entry.internal_ip_address)
            .collect())
    }

    async fn create_user(
        &self,
        address: &str,
        app_name: &str,
        client_id: &str,
    ) -> Result<PairingCredential, HueError> {
        let body = json!({
            "devicetype": format!("{app_name}#{client_id}"),
            "generateclientkey": true,
        });
        let response: Value = self
            .http
            .post(format!("{}/api", base_url(address)))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let success = wire::parse_pairing(response)?;
        Ok(PairingCredential {
            gateway_address: address.to_string(),
            username: success.username,
            client_key: success.clientkey.unwrap_or_default(),
            client_id: client_id.to_string(),
        })
    }

    async fn open_session(&self, credential: &PairingCredential) -> Result<HueSession, HueError> {
        let session = HueSession {
            http: self.http.clone(),
            api: format!(
                "{}/api/{}",
                base_url(&credential.gateway_address),
                credential.username
            ),
        };
        let config = session.get("config").await?;
        if !config.is_object() {
            return Err(HueError::UnexpectedResponse(
                "gateway config is not an object".to_string(),
            ));
        }
        Ok(session)
    }
}

impl GatewayClient for HueClient {
    type Session = HueSession;

    async fn discover(&self) -> Result<Vec<String>, HueMqttError> {
        let addresses = self.discover_addresses().await?;
        tracing::debug!(count = addresses.len(), "gateway discovery answered");
        Ok(addresses)
    }

    async fn pair(
        &self,
        address: &str,
        app_name: &str,
        client_id: &str,
    ) -> Result<PairingCredential, HueMqttError> {
        Ok(self.create_user(address, app_name, client_id).await?)
    }

    async fn connect(&self, credential: &PairingCredential) -> Result<HueSession, HueMqttError> {
        Ok(self.open_session(credential).await?)
    }
}

/// Authenticated access rooted at `/api/<username>`.
#[derive(Debug, Clone)]
pub struct HueSession {
    http: reqwest::Client,
    api: String,
}

impl HueSession {
    async fn get(&self, path: &str) -> Result<Value, HueError> {
        let value: Value = self
            .http
            .get(format!("{}/{path}", self.api))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        match wire::first_error(&value) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }

    async fn put(&self, path: &str, state: &StatePatch) -> Result<(), HueError> {
        let value: Value = self
            .http
            .put(format!("{}/{path}", self.api))
            .json(state)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        match wire::first_error(&value) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl GatewaySession for HueSession {
    async fn enumerate(&self, device_type: DeviceType) -> Result<Vec<GatewayDevice>, HueMqttError> {
        let value = self.get(device_type.as_str()).await?;
        Ok(wire::parse_devices(device_type, value)?)
    }

    async fn set_light_state(&self, id: &str, state: &StatePatch) -> Result<(), HueMqttError> {
        Ok(self.put(&format!("lights/{id}/state"), state).await?)
    }

    async fn set_group_state(&self, id: &str, state: &StatePatch) -> Result<(), HueMqttError> {
        Ok(self.put(&format!("groups/{id}/action"), state).await?)
    }
}
