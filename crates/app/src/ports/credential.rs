//! Credential sink port.

use std::future::Future;

use huemqtt_domain::credential::PairingCredential;
use huemqtt_domain::error::HueMqttError;

/// Receives credentials right after a successful pairing so they survive a
/// restart. The link itself never reads them back.
pub trait CredentialSink: Send + Sync {
    fn persist(
        &self,
        credential: &PairingCredential,
    ) -> impl Future<Output = Result<(), HueMqttError>> + Send;
}

impl<T: CredentialSink> CredentialSink for std::sync::Arc<T> {
    fn persist(
        &self,
        credential: &PairingCredential,
    ) -> impl Future<Output = Result<(), HueMqttError>> + Send {
        (**self).persist(credential)
    }
}
