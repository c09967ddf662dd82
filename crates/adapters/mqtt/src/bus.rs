//! rumqttc-backed message bus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use huemqtt_app::ports::{BusMessage, MessageBus, Subscription};
use huemqtt_domain::error::HueMqttError;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, Transport,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Pause after a connection error before the event loop reconnects.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Pending requests between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 64;

/// Undelivered messages per subscription before new ones are dropped.
const SUBSCRIPTION_CAPACITY: usize = 64;

struct Route {
    filter: String,
    sender: mpsc::Sender<BusMessage>,
}

/// State shared between the bus handle and the event loop task.
#[derive(Default)]
struct Shared {
    connected: AtomicBool,
    routes: Mutex<Vec<Route>>,
}

impl Shared {
    fn routes(&self) -> std::sync::MutexGuard<'_, Vec<Route>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn filters(&self) -> Vec<String> {
        let mut filters: Vec<String> = self.routes().iter().map(|r| r.filter.clone()).collect();
        filters.sort_unstable();
        filters.dedup();
        filters
    }

    /// Hand `payload` to every matching subscription, forgetting the ones
    /// whose receiver is gone.
    fn dispatch(&self, topic: &str, payload: &[u8]) -> usize {
        let mut delivered = 0;
        self.routes().retain(|route| {
            if !rumqttc::matches(topic, &route.filter) {
                return true;
            }
            match route.sender.try_send(BusMessage::new(topic, payload)) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(topic, filter = %route.filter, "subscriber lagging, message dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        delivered
    }
}

/// Message bus connected to one MQTT broker.
///
/// The event loop task lives as long as the bus; dropping the bus aborts it.
pub struct MqttBus {
    client: AsyncClient,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl MqttBus {
    /// Start connecting to the broker in the background.
    ///
    /// Returns immediately; [`is_connected`](MessageBus::is_connected) turns
    /// `true` once the broker accepted the session.
    #[must_use]
    pub fn connect(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.server, config.port);
        options.set_keep_alive(config.keep_alive());
        if let Some(login) = &config.login {
            options.set_credentials(login, config.password.clone().unwrap_or_default());
        }
        if config.use_tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let shared = Arc::new(Shared::default());
        let task = tokio::spawn(drive(eventloop, client.clone(), Arc::clone(&shared)));
        tracing::info!(
            server = %config.server,
            port = config.port,
            tls = config.use_tls,
            "MQTT event loop started"
        );
        Self {
            client,
            shared,
            task,
        }
    }

    /// Send a clean disconnect to the broker and stop the event loop.
    pub async fn disconnect(&self) {
        if self.shared.connected.load(Ordering::SeqCst) {
            if let Err(err) = self.client.disconnect().await {
                tracing::debug!(error = %err, "MQTT disconnect request failed");
            }
        }
        self.shared.connected.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for MqttBus {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Poll the event loop forever, tracking connection state and routing
/// inbound publishes.
async fn drive(mut eventloop: EventLoop, client: AsyncClient, shared: Arc<Shared>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    tracing::warn!(code = ?ack.code, "broker refused connection");
                    continue;
                }
                shared.connected.store(true, Ordering::SeqCst);
                let filters = shared.filters();
                tracing::info!(subscriptions = filters.len(), "connected to MQTT broker");
                for filter in filters {
                    if let Err(err) = client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
                        tracing::warn!(%filter, error = %err, "re-subscribe failed");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let delivered = shared.dispatch(&publish.topic, &publish.payload);
                tracing::trace!(topic = %publish.topic, delivered, "message received");
            }
            Ok(_) => {}
            Err(err) => {
                if shared.connected.swap(false, Ordering::SeqCst) {
                    tracing::warn!(error = %err, "lost connection to MQTT broker");
                } else {
                    tracing::debug!(error = %err, "MQTT broker unreachable");
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

impl MessageBus for MqttBus {
    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<(), HueMqttError> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected.into());
        }
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
            .map_err(MqttError::from)?;
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<Subscription, HueMqttError> {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        self.shared.routes().push(Route {
            filter: filter.to_string(),
            sender,
        });
        if self.is_connected() {
            self.client
                .subscribe(filter, QoS::AtLeastOnce)
                .await
                .map_err(MqttError::from)?;
        }
        tracing::debug!(filter, "subscribed");
        Ok(Subscription::new(receiver))
    }

    async fn unsubscribe(&self, filter: &str) -> Result<(), HueMqttError> {
        self.shared.routes().retain(|route| route.filter != filter);
        if self.is_connected() {
            self.client
                .unsubscribe(filter)
                .await
                .map_err(MqttError::from)?;
        }
        tracing::debug!(filter, "unsubscribed");
        Ok(())
    }
}
