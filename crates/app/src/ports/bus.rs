//! Message bus port — topic-based publish/subscribe.

use std::future::Future;

use huemqtt_domain::error::HueMqttError;
use tokio::sync::mpsc;

/// One inbound message delivered to a [`Subscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Receiving end of a topic filter subscription.
///
/// Dropping it stops delivery locally; [`MessageBus::unsubscribe`] also
/// tells the broker.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<BusMessage>,
}

impl Subscription {
    #[must_use]
    pub fn new(receiver: mpsc::Receiver<BusMessage>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message. `None` once the bus side is gone.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.receiver.recv().await
    }
}

/// Topic-based message bus (an MQTT broker in production).
pub trait MessageBus: Send + Sync {
    /// Whether the broker connection is currently up.
    fn is_connected(&self) -> bool;

    /// Publish `payload` to `topic`. Retained messages are replayed to late
    /// subscribers by the broker.
    fn publish(
        &self,
        topic: &str,
        payload: String,
        retain: bool,
    ) -> impl Future<Output = Result<(), HueMqttError>> + Send;

    /// Subscribe to a filter that may contain `+` and `#` wildcards.
    fn subscribe(
        &self,
        filter: &str,
    ) -> impl Future<Output = Result<Subscription, HueMqttError>> + Send;

    /// Cancel a filter previously passed to [`subscribe`](Self::subscribe).
    fn unsubscribe(&self, filter: &str) -> impl Future<Output = Result<(), HueMqttError>> + Send;
}

impl<T: MessageBus> MessageBus for std::sync::Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn publish(
        &self,
        topic: &str,
        payload: String,
        retain: bool,
    ) -> impl Future<Output = Result<(), HueMqttError>> + Send {
        (**self).publish(topic, payload, retain)
    }

    fn subscribe(
        &self,
        filter: &str,
    ) -> impl Future<Output = Result<Subscription, HueMqttError>> + Send {
        (**self).subscribe(filter)
    }

    fn unsubscribe(&self, filter: &str) -> impl Future<Output = Result<(), HueMqttError>> + Send {
        (**self).unsubscribe(filter)
    }
}
