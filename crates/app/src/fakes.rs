//! In-memory port implementations recording every call, for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use huemqtt_domain::credential::PairingCredential;
use huemqtt_domain::device::{
    DeviceType, GatewayDevice, GroupPayload, LightPayload, SensorPayload,
};
use huemqtt_domain::error::HueMqttError;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::ports::{
    BusMessage, CredentialSink, GatewayClient, GatewaySession, MessageBus, StatePatch,
    Subscription,
};

fn failure(message: &str) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::other(message.to_string()))
}

pub fn light(id: &str, name: &str, state: Value) -> GatewayDevice {
    GatewayDevice::Light(LightPayload {
        id: id.to_string(),
        name: name.to_string(),
        model: Some("LCT015".to_string()),
        state: state.into(),
    })
}

pub fn group(id: &str, name: &str, action: Value) -> GatewayDevice {
    GatewayDevice::Group(GroupPayload {
        id: id.to_string(),
        name: name.to_string(),
        model: Some("Room".to_string()),
        action: action.into(),
    })
}

pub fn sensor(id: &str, name: &str, state: Value, config: Value) -> GatewayDevice {
    GatewayDevice::Sensor(SensorPayload {
        id: id.to_string(),
        name: name.to_string(),
        model: Some("RWL021".to_string()),
        state: state.into(),
        config: config.into(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

/// Records publishes and feeds injected messages to subscribers.
pub struct FakeBus {
    connected: AtomicBool,
    fail_publish: AtomicBool,
    published: Mutex<Vec<Published>>,
    subscribers: Mutex<Vec<(String, mpsc::Sender<BusMessage>)>>,
    unsubscribed: Mutex<Vec<String>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            fail_publish: AtomicBool::new(false),
            published: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            unsubscribed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn payloads_for(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload)
            .collect()
    }

    pub fn find(&self, topic: &str) -> Option<Published> {
        self.published().into_iter().find(|p| p.topic == topic)
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscribers
            .lock()
            .unwrap()
            .iter()
            .map(|(filter, _)| filter.clone())
            .collect()
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().unwrap().clone()
    }

    /// Deliver an inbound message to every subscriber.
    pub fn inject(&self, topic: &str, payload: &[u8]) {
        for (_, tx) in self.subscribers.lock().unwrap().iter() {
            let _ = tx.try_send(BusMessage::new(topic, payload));
        }
    }
}

impl MessageBus for FakeBus {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<(), HueMqttError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(HueMqttError::Bus(failure("publish refused")));
        }
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload,
            retain,
        });
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<Subscription, HueMqttError> {
        let (tx, rx) = mpsc::channel(16);
        self.subscribers
            .lock()
            .unwrap()
            .push((filter.to_string(), tx));
        Ok(Subscription::new(rx))
    }

    async fn unsubscribe(&self, filter: &str) -> Result<(), HueMqttError> {
        self.subscribers.lock().unwrap().retain(|(f, _)| f != filter);
        self.unsubscribed.lock().unwrap().push(filter.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct SessionState {
    devices: Mutex<HashMap<DeviceType, Vec<GatewayDevice>>>,
    failing: Mutex<HashSet<DeviceType>>,
    fail_writes: AtomicBool,
    enumerations: AtomicUsize,
    light_calls: Mutex<Vec<(String, StatePatch)>>,
    group_calls: Mutex<Vec<(String, StatePatch)>>,
}

/// Shared, cloneable gateway session backed by in-memory device lists.
#[derive(Clone, Default)]
pub struct FakeSession {
    state: Arc<SessionState>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_devices(&self, device_type: DeviceType, devices: Vec<GatewayDevice>) {
        self.state
            .devices
            .lock()
            .unwrap()
            .insert(device_type, devices);
    }

    pub fn fail_enumeration(&self, device_type: DeviceType, fail: bool) {
        let mut failing = self.state.failing.lock().unwrap();
        if fail {
            failing.insert(device_type);
        } else {
            failing.remove(&device_type);
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn enumerations(&self) -> usize {
        self.state.enumerations.load(Ordering::SeqCst)
    }

    pub fn light_calls(&self) -> Vec<(String, StatePatch)> {
        self.state.light_calls.lock().unwrap().clone()
    }

    pub fn group_calls(&self) -> Vec<(String, StatePatch)> {
        self.state.group_calls.lock().unwrap().clone()
    }

    fn write(
        &self,
        calls: &Mutex<Vec<(String, StatePatch)>>,
        id: &str,
        state: &StatePatch,
    ) -> Result<(), HueMqttError> {
        calls.lock().unwrap().push((id.to_string(), state.clone()));
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(HueMqttError::Gateway(failure("write refused")));
        }
        Ok(())
    }
}

impl GatewaySession for FakeSession {
    async fn enumerate(&self, device_type: DeviceType) -> Result<Vec<GatewayDevice>, HueMqttError> {
        self.state.enumerations.fetch_add(1, Ordering::SeqCst);
        if self.state.failing.lock().unwrap().contains(&device_type) {
            return Err(HueMqttError::Gateway(failure("gateway unreachable")));
        }
        Ok(self
            .state
            .devices
            .lock()
            .unwrap()
            .get(&device_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_light_state(&self, id: &str, state: &StatePatch) -> Result<(), HueMqttError> {
        self.write(&self.state.light_calls, id, state)
    }

    async fn set_group_state(&self, id: &str, state: &StatePatch) -> Result<(), HueMqttError> {
        self.write(&self.state.group_calls, id, state)
    }
}

/// Outcome of the next pairing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairBehaviour {
    ButtonNotPressed,
    Fail,
    Succeed,
}

/// Scriptable gateway client.
pub struct FakeGateway {
    pub session: FakeSession,
    discoveries: Mutex<VecDeque<Result<Vec<String>, ()>>>,
    pairings: Mutex<VecDeque<PairBehaviour>>,
    fail_connect: AtomicBool,
    pub discover_calls: AtomicUsize,
    pub pair_calls: AtomicUsize,
    pub connect_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new(session: FakeSession) -> Self {
        Self {
            session,
            discoveries: Mutex::new(VecDeque::new()),
            pairings: Mutex::new(VecDeque::new()),
            fail_connect: AtomicBool::new(false),
            discover_calls: AtomicUsize::new(0),
            pair_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
        }
    }

    /// Queue discovery results; once drained, discovery finds nothing.
    pub fn push_discovery(&self, result: Result<Vec<String>, ()>) {
        self.discoveries.lock().unwrap().push_back(result);
    }

    /// Queue pairing outcomes; once drained, pairing succeeds.
    pub fn push_pairing(&self, behaviour: PairBehaviour) {
        self.pairings.lock().unwrap().push_back(behaviour);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }
}

impl GatewayClient for FakeGateway {
    type Session = FakeSession;

    async fn discover(&self) -> Result<Vec<String>, HueMqttError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        match self.discoveries.lock().unwrap().pop_front() {
            Some(Ok(addresses)) => Ok(addresses),
            Some(Err(())) => Err(HueMqttError::Gateway(failure("discovery unavailable"))),
            None => Ok(Vec::new()),
        }
    }

    async fn pair(
        &self,
        address: &str,
        _app_name: &str,
        client_id: &str,
    ) -> Result<PairingCredential, HueMqttError> {
        self.pair_calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self
            .pairings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PairBehaviour::Succeed);
        match behaviour {
            PairBehaviour::ButtonNotPressed => Err(HueMqttError::LinkButtonNotPressed),
            PairBehaviour::Fail => Err(HueMqttError::Gateway(failure("pairing refused"))),
            PairBehaviour::Succeed => Ok(PairingCredential {
                gateway_address: address.to_string(),
                username: "generated-user".to_string(),
                client_key: "generated-key".to_string(),
                client_id: client_id.to_string(),
            }),
        }
    }

    async fn connect(&self, _credential: &PairingCredential) -> Result<FakeSession, HueMqttError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(HueMqttError::Gateway(failure("unauthorized user")));
        }
        Ok(self.session.clone())
    }
}

/// Keeps every persisted credential.
#[derive(Default)]
pub struct FakeSink {
    saved: Mutex<Vec<PairingCredential>>,
}

impl FakeSink {
    pub fn saved(&self) -> Vec<PairingCredential> {
        self.saved.lock().unwrap().clone()
    }
}

impl CredentialSink for FakeSink {
    async fn persist(&self, credential: &PairingCredential) -> Result<(), HueMqttError> {
        self.saved.lock().unwrap().push(credential.clone());
        Ok(())
    }
}
