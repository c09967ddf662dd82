//! Gateway ports — discovery, pairing, and the authenticated session.
//!
//! A [`GatewayClient`] is unauthenticated: it finds gateways on the network,
//! runs the pairing handshake, and opens a [`GatewaySession`] from a stored
//! credential. Every device read and write goes through the session.

use std::collections::BTreeMap;
use std::future::Future;

use huemqtt_domain::credential::PairingCredential;
use huemqtt_domain::device::{DeviceType, GatewayDevice};
use huemqtt_domain::error::HueMqttError;
use huemqtt_domain::property::PropertyValue;

/// Partial state sent to the gateway, e.g. `{"on": true}`.
pub type StatePatch = BTreeMap<String, PropertyValue>;

/// Unauthenticated access to gateways on the local network.
pub trait GatewayClient: Send + Sync {
    /// Session type produced by [`connect`](Self::connect).
    type Session: GatewaySession + 'static;

    /// Query the network for gateway addresses, in preference order.
    ///
    /// An empty list means the query worked but found nothing.
    fn discover(&self) -> impl Future<Output = Result<Vec<String>, HueMqttError>> + Send;

    /// Run the pairing handshake against `address`.
    ///
    /// Returns [`HueMqttError::LinkButtonNotPressed`] while the user has not
    /// pressed the physical button yet.
    fn pair(
        &self,
        address: &str,
        app_name: &str,
        client_id: &str,
    ) -> impl Future<Output = Result<PairingCredential, HueMqttError>> + Send;

    /// Open an authenticated session and verify the credential is accepted.
    fn connect(
        &self,
        credential: &PairingCredential,
    ) -> impl Future<Output = Result<Self::Session, HueMqttError>> + Send;
}

/// Authenticated access to one gateway.
pub trait GatewaySession: Send + Sync {
    /// List every device of `device_type` with its current raw payload.
    fn enumerate(
        &self,
        device_type: DeviceType,
    ) -> impl Future<Output = Result<Vec<GatewayDevice>, HueMqttError>> + Send;

    /// Apply a partial state to a single light.
    fn set_light_state(
        &self,
        id: &str,
        state: &StatePatch,
    ) -> impl Future<Output = Result<(), HueMqttError>> + Send;

    /// Apply a partial state to every light of a group.
    fn set_group_state(
        &self,
        id: &str,
        state: &StatePatch,
    ) -> impl Future<Output = Result<(), HueMqttError>> + Send;
}

impl<T: GatewayClient> GatewayClient for std::sync::Arc<T> {
    type Session = T::Session;

    fn discover(&self) -> impl Future<Output = Result<Vec<String>, HueMqttError>> + Send {
        (**self).discover()
    }

    fn pair(
        &self,
        address: &str,
        app_name: &str,
        client_id: &str,
    ) -> impl Future<Output = Result<PairingCredential, HueMqttError>> + Send {
        (**self).pair(address, app_name, client_id)
    }

    fn connect(
        &self,
        credential: &PairingCredential,
    ) -> impl Future<Output = Result<Self::Session, HueMqttError>> + Send {
        (**self).connect(credential)
    }
}
