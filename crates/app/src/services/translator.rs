//! Translator — mirrors gateway devices onto the bus and routes commands back.
//!
//! Three operations, all driven by the poll worker:
//!
//! - **full publish**: every device of every type, with device metadata,
//!   property values, and property descriptors
//! - **diff pass**: re-read the gateway and publish only values that changed
//!   since the last publish
//! - **command**: apply an inbound `.../set` message optimistically and
//!   forward it to the gateway
//!
//! The translator is the only owner of the [`DeviceCache`].

use std::sync::Arc;

use huemqtt_domain::device::{
    CachedDevice, DeviceIdentity, DeviceStatus, DeviceType, GatewayDevice, Snapshot,
};
use huemqtt_domain::error::{NotFoundError, ValidationError};
use huemqtt_domain::property::{PropertyTable, PropertyValue};
use huemqtt_domain::topic::{HOMIE_VERSION, TopicLayout};
use tokio::sync::watch;

use crate::ports::{BusMessage, GatewaySession, MessageBus, StatePatch};
use crate::services::device_cache::DeviceCache;

/// Why an inbound command was dropped without reaching the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Topic or payload could not be interpreted.
    Malformed(ValidationError),
    /// The device, or this property of it, was never published.
    NotFound(NotFoundError),
    /// The property is not settable.
    ReadOnly,
    /// The device type has no write path on the gateway.
    NotWritable,
    /// The link is shutting down.
    Closed,
}

/// What happened to one inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Cache and bus updated, gateway accepted the change.
    Applied,
    /// Cache and bus updated, the gateway call failed. Nothing is reverted.
    GatewayFailed,
    /// The value equals the cached one; nothing was sent.
    Redundant,
    Rejected(RejectReason),
}

/// Translates between gateway payloads and bus topics.
pub struct Translator<B> {
    bus: Arc<B>,
    properties: Arc<PropertyTable>,
    layout: TopicLayout,
    cache: DeviceCache,
    debug: bool,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<B: MessageBus> Translator<B> {
    /// Create a translator with an empty cache.
    pub fn new(bus: Arc<B>, properties: Arc<PropertyTable>, layout: TopicLayout) -> Self {
        Self {
            bus,
            properties,
            layout,
            cache: DeviceCache::new(),
            debug: false,
            shutdown: None,
        }
    }

    /// Log every publish at `info`.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Stop mutating the cache once `shutdown` turns `true`.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    #[must_use]
    pub fn cache(&self) -> &DeviceCache {
        &self.cache
    }

    #[must_use]
    pub fn layout(&self) -> &TopicLayout {
        &self.layout
    }

    fn is_closed(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Publish every device the gateway reports. Returns how many devices
    /// were published.
    ///
    /// A type whose enumeration fails is skipped; the others still go out.
    /// Devices of a successfully enumerated type that are no longer reported
    /// are dropped from the cache.
    #[tracing::instrument(skip_all)]
    pub async fn publish_all<S: GatewaySession>(&mut self, session: &S) -> usize {
        let mut published = 0;
        for device_type in DeviceType::ALL {
            let devices = match session.enumerate(device_type).await {
                Ok(devices) => devices,
                Err(err) => {
                    tracing::warn!(%device_type, error = %err, "enumeration failed, skipping type");
                    continue;
                }
            };
            if self.is_closed() {
                return published;
            }

            let seen: Vec<DeviceIdentity> = devices.iter().map(GatewayDevice::identity).collect();
            for gone in self.cache.retain_seen(device_type, &seen) {
                tracing::info!(device = %gone, "device no longer reported by gateway");
            }

            for device in &devices {
                self.publish_device(device).await;
                published += 1;
            }
        }
        tracing::info!(devices = published, "full publish complete");
        published
    }

    /// Publish device-level metadata and properties of one device.
    ///
    /// The cached entry is rebuilt from what this pass published. A value or
    /// `$state` whose publish failed keeps its previous cached value, so the
    /// next diff pass sends it again.
    pub async fn publish_device(&mut self, device: &GatewayDevice) -> bool {
        let identity = device.identity();
        let snapshot = device.snapshot();
        let status = snapshot.status();
        let node = identity.device_type.as_str();
        let state_topic = self.layout.device_attribute(&identity, "$state");

        let retained = [
            (
                self.layout.device_attribute(&identity, "$homie"),
                HOMIE_VERSION.to_string(),
            ),
            (
                self.layout.device_attribute(&identity, "$name"),
                device.name().to_string(),
            ),
            (state_topic.clone(), status.to_string()),
            (
                self.layout.device_attribute(&identity, "$nodes"),
                node.to_string(),
            ),
            (
                self.layout.node_attribute(&identity, "$name"),
                node.to_string(),
            ),
        ];
        let mut state_sent = false;
        for (topic, payload) in retained {
            let sent = self.send(&topic, payload, true).await;
            if topic == state_topic {
                state_sent = sent;
            }
        }

        let previous = self.cache.upsert(CachedDevice::from_device(device, status));
        let exposed = self.publish_properties(&identity, &snapshot).await;

        if let Some(previous) = previous {
            if !state_sent {
                self.cache.set_status(&identity, previous.status);
            }
            let still_managed: Vec<String> = self
                .managed_values(&snapshot)
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            for (name, value) in previous.properties {
                if still_managed.contains(&name) && self.cache.property(&identity, &name).is_none() {
                    self.cache.set_property(&identity, &name, value);
                }
            }
        }
        exposed
    }

    /// Managed properties of `snapshot` converted to bus values, sorted by
    /// name.
    fn managed_values(&self, snapshot: &Snapshot) -> Vec<(String, PropertyValue)> {
        let mut values: Vec<(String, PropertyValue)> = snapshot
            .iter()
            .filter_map(|(name, raw)| {
                let descriptor = self.properties.get(name)?;
                Some((name.clone(), PropertyValue::from_json(raw, descriptor.datatype)?))
            })
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        values
    }

    /// Publish the managed properties found in `snapshot`.
    ///
    /// Returns `false` without publishing anything when the snapshot holds
    /// no managed property.
    pub async fn publish_properties(&mut self, identity: &DeviceIdentity, snapshot: &Snapshot) -> bool {
        let exposed = self.managed_values(snapshot);
        if exposed.is_empty() {
            tracing::warn!(device = %identity, "device exposes no managed property");
            return false;
        }

        let names: Vec<&str> = exposed.iter().map(|(name, _)| name.as_str()).collect();
        self.send(
            &self.layout.node_attribute(identity, "$properties"),
            names.join(","),
            false,
        )
        .await;

        let table = Arc::clone(&self.properties);
        for (name, value) in exposed {
            let topic = self.layout.property(identity, &name);
            if self.send(&topic, value.to_string(), false).await {
                self.cache.set_property(identity, &name, value);
            }
            let Some(descriptor) = table.get(&name) else {
                continue;
            };
            for (attribute, payload) in descriptor.metadata() {
                self.send(
                    &self.layout.property_attribute(identity, &name, attribute),
                    payload,
                    true,
                )
                .await;
            }
        }
        true
    }

    /// Re-read the gateway and publish what drifted since the last publish.
    /// Returns the number of property values re-published.
    ///
    /// Only properties already in the cache are compared; devices that
    /// appeared since the last full publish are ignored.
    #[tracing::instrument(skip_all)]
    pub async fn poll_changes<S: GatewaySession>(&mut self, session: &S) -> usize {
        let mut changed = 0;
        for device_type in DeviceType::ALL {
            if !self.cache.has_type(device_type) {
                continue;
            }
            let devices = match session.enumerate(device_type).await {
                Ok(devices) => devices,
                Err(err) => {
                    tracing::warn!(%device_type, error = %err, "poll failed, retrying next tick");
                    continue;
                }
            };
            if self.is_closed() {
                return changed;
            }
            for device in &devices {
                changed += self.apply_drift(device).await;
            }
        }
        if changed > 0 {
            tracing::debug!(changed, "poll pass published changes");
        }
        changed
    }

    async fn apply_drift(&mut self, device: &GatewayDevice) -> usize {
        let identity = device.identity();
        let Some(cached) = self.cache.get(&identity) else {
            return 0;
        };
        let snapshot = device.snapshot();
        let status = snapshot.status();
        let status_flipped = cached.status != status;

        let table = Arc::clone(&self.properties);
        let drifted: Vec<(String, PropertyValue)> = cached
            .properties
            .iter()
            .filter_map(|(name, previous)| {
                let descriptor = table.get(name)?;
                let fresh = PropertyValue::from_json(snapshot.get(name)?, descriptor.datatype)?;
                (fresh != *previous).then(|| (name.clone(), fresh))
            })
            .collect();

        if status_flipped {
            tracing::info!(device = %identity, %status, "device reachability changed");
            let topic = self.layout.device_attribute(&identity, "$state");
            if self.send(&topic, status.to_string(), true).await {
                self.cache.set_status(&identity, status);
            }
        }

        let mut changed = 0;
        for (name, value) in drifted {
            let topic = self.layout.property(&identity, &name);
            if self.send(&topic, value.to_string(), false).await {
                self.cache.set_property(&identity, &name, value);
                changed += 1;
            }
        }
        changed
    }

    /// Route one inbound `.../set` message.
    ///
    /// The cache is updated and the new value echoed on the bus before the
    /// gateway is called. A failing gateway call is logged, not reverted.
    #[tracing::instrument(skip_all, fields(topic = %message.topic))]
    pub async fn handle_command<S: GatewaySession>(
        &mut self,
        session: &S,
        message: &BusMessage,
    ) -> CommandOutcome {
        let target = match self.layout.parse_command(&message.topic) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed command topic");
                return CommandOutcome::Rejected(RejectReason::Malformed(err));
            }
        };
        let Ok(payload) = std::str::from_utf8(&message.payload) else {
            tracing::warn!("ignoring command with non UTF-8 payload");
            return CommandOutcome::Rejected(RejectReason::Malformed(
                ValidationError::NonUtf8Payload,
            ));
        };
        let value = PropertyValue::coerce(payload);
        let identity = &target.identity;
        let property = target.property.as_str();

        let current = match self.cache.lookup(identity, property) {
            Ok(current) => current,
            Err(err) => {
                tracing::warn!(error = %err, "command for unpublished target");
                return CommandOutcome::Rejected(RejectReason::NotFound(err));
            }
        };
        if !self.properties.get(property).is_some_and(|d| d.settable) {
            tracing::warn!(device = %identity, property, "command for read-only property");
            return CommandOutcome::Rejected(RejectReason::ReadOnly);
        }
        if !identity.device_type.is_writable() {
            tracing::warn!(device = %identity, property, "device type accepts no commands");
            return CommandOutcome::Rejected(RejectReason::NotWritable);
        }
        if *current == value {
            tracing::debug!(device = %identity, property, "value unchanged, nothing to send");
            return CommandOutcome::Redundant;
        }
        if self.is_closed() {
            return CommandOutcome::Rejected(RejectReason::Closed);
        }

        self.cache.set_property(identity, property, value.clone());
        self.send(
            &self.layout.property(identity, property),
            value.to_string(),
            false,
        )
        .await;

        let patch = StatePatch::from([(property.to_string(), value)]);
        let result = if identity.device_type == DeviceType::Groups {
            session.set_group_state(&identity.gateway_id, &patch).await
        } else {
            session.set_light_state(&identity.gateway_id, &patch).await
        };
        match result {
            Ok(()) => {
                tracing::debug!(device = %identity, property, payload, "command forwarded");
                CommandOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(
                    topic = %message.topic,
                    payload,
                    error = %err,
                    "gateway rejected command"
                );
                CommandOutcome::GatewayFailed
            }
        }
    }

    /// Publish one message. Failures are logged and reported as `false`.
    async fn send(&self, topic: &str, payload: String, retain: bool) -> bool {
        if self.debug {
            tracing::info!(topic, payload = %payload, retain, "publish");
        } else {
            tracing::trace!(topic, payload = %payload, retain, "publish");
        }
        match self.bus.publish(topic, payload, retain).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(topic, error = %err, "publish failed");
                false
            }
        }
    }
}
