//! Devices — gateway payloads, their snapshots, and the cached mirror.
//!
//! Raw gateway payloads are modelled as a tagged union ([`GatewayDevice`]),
//! one variant per device type, each with its own snapshot extraction:
//!
//! | Type | Snapshot |
//! |------|----------|
//! | `lights` | reported `state` |
//! | `groups` | reported `action` |
//! | `sensors` | `state` merged with `config` (config wins on collision) |
//!
//! Snapshots stay loosely keyed until they are intersected with the
//! managed property table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::property::PropertyValue;

/// The three device collections exposed by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceType {
    Lights,
    Groups,
    Sensors,
}

impl DeviceType {
    /// Every type, in full-publish order.
    pub const ALL: [Self; 3] = [Self::Lights, Self::Groups, Self::Sensors];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lights => "lights",
            Self::Groups => "groups",
            Self::Sensors => "sensors",
        }
    }

    /// Whether inbound commands can be forwarded to the gateway.
    #[must_use]
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::Sensors)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lights" => Ok(Self::Lights),
            "groups" => Ok(Self::Groups),
            "sensors" => Ok(Self::Sensors),
            other => Err(ValidationError::UnknownDeviceType(other.to_string())),
        }
    }
}

/// Composite key `{deviceType, gatewayId}`, printed as `lights-5`.
///
/// Used both as cache key and as the device segment of every topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIdentity {
    pub device_type: DeviceType,
    pub gateway_id: String,
}

impl DeviceIdentity {
    #[must_use]
    pub fn new(device_type: DeviceType, gateway_id: impl Into<String>) -> Self {
        Self {
            device_type,
            gateway_id: gateway_id.into(),
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.device_type, self.gateway_id)
    }
}

impl FromStr for DeviceIdentity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (device_type, gateway_id) = s
            .split_once('-')
            .ok_or_else(|| ValidationError::MalformedDeviceId(s.to_string()))?;
        if gateway_id.is_empty() {
            return Err(ValidationError::MalformedDeviceId(s.to_string()));
        }
        Ok(Self::new(device_type.parse()?, gateway_id))
    }
}

/// Published top-level device status (`$state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Ready,
    Disconnected,
}

impl DeviceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state object read from one device payload at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    /// Overlay `other` on top of `self`; keys of `other` win.
    #[must_use]
    pub fn merge(mut self, other: Snapshot) -> Self {
        self.0.extend(other.0);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Disconnected` only when the snapshot explicitly reports
    /// `reachable: false`.
    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        match self.0.get("reachable") {
            Some(Value::Bool(false)) => DeviceStatus::Disconnected,
            _ => DeviceStatus::Ready,
        }
    }
}

impl From<Map<String, Value>> for Snapshot {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Value> for Snapshot {
    /// Anything but a JSON object yields an empty snapshot.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// A light as reported by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct LightPayload {
    pub id: String,
    pub name: String,
    pub model: Option<String>,
    pub state: Snapshot,
}

/// A group (room, zone, …) as reported by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPayload {
    pub id: String,
    pub name: String,
    pub model: Option<String>,
    pub action: Snapshot,
}

/// A sensor as reported by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorPayload {
    pub id: String,
    pub name: String,
    pub model: Option<String>,
    pub state: Snapshot,
    pub config: Snapshot,
}

/// One raw device payload, tagged by device type.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayDevice {
    Light(LightPayload),
    Group(GroupPayload),
    Sensor(SensorPayload),
}

impl GatewayDevice {
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        match self {
            Self::Light(_) => DeviceType::Lights,
            Self::Group(_) => DeviceType::Groups,
            Self::Sensor(_) => DeviceType::Sensors,
        }
    }

    #[must_use]
    pub fn identity(&self) -> DeviceIdentity {
        let id = match self {
            Self::Light(l) => &l.id,
            Self::Group(g) => &g.id,
            Self::Sensor(s) => &s.id,
        };
        DeviceIdentity::new(self.device_type(), id.clone())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Light(l) => &l.name,
            Self::Group(g) => &g.name,
            Self::Sensor(s) => &s.name,
        }
    }

    #[must_use]
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Light(l) => l.model.as_deref(),
            Self::Group(g) => g.model.as_deref(),
            Self::Sensor(s) => s.model.as_deref(),
        }
    }

    /// Derive the diffable snapshot for this device type.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        match self {
            Self::Light(l) => l.state.clone(),
            Self::Group(g) => g.action.clone(),
            Self::Sensor(s) => s.state.clone().merge(s.config.clone()),
        }
    }
}

/// Local mirror of what has been published for one device.
///
/// `properties` only ever holds managed properties that were published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDevice {
    pub identity: DeviceIdentity,
    pub display_name: String,
    pub model: Option<String>,
    pub status: DeviceStatus,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl CachedDevice {
    /// Start a cache entry for `device`, with no published properties yet.
    #[must_use]
    pub fn from_device(device: &GatewayDevice, status: DeviceStatus) -> Self {
        Self {
            identity: device.identity(),
            display_name: device.name().to_string(),
            model: device.model().map(str::to_string),
            status,
            properties: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sensor(state: Value, config: Value) -> GatewayDevice {
        GatewayDevice::Sensor(SensorPayload {
            id: "12".to_string(),
            name: "Hallway switch".to_string(),
            model: Some("RWL021".to_string()),
            state: state.into(),
            config: config.into(),
        })
    }

    #[test]
    fn should_print_identity_as_type_dash_id() {
        let id = DeviceIdentity::new(DeviceType::Lights, "5");
        assert_eq!(id.to_string(), "lights-5");
    }

    #[test]
    fn should_parse_identity_from_topic_segment() {
        let id: DeviceIdentity = "groups-0".parse().unwrap();
        assert_eq!(id, DeviceIdentity::new(DeviceType::Groups, "0"));
    }

    #[test]
    fn should_reject_identity_with_unknown_type() {
        let result = "switches-3".parse::<DeviceIdentity>();
        assert_eq!(
            result,
            Err(ValidationError::UnknownDeviceType("switches".to_string()))
        );
    }

    #[test]
    fn should_reject_identity_without_separator_or_id() {
        assert!(matches!(
            "lights5".parse::<DeviceIdentity>(),
            Err(ValidationError::MalformedDeviceId(_))
        ));
        assert!(matches!(
            "lights-".parse::<DeviceIdentity>(),
            Err(ValidationError::MalformedDeviceId(_))
        ));
    }

    #[test]
    fn should_let_config_override_state_when_merging_sensor_snapshot() {
        let device = sensor(json!({"battery": 80}), json!({"battery": 90, "on": true}));
        let snapshot = device.snapshot();
        assert_eq!(snapshot.get("battery"), Some(&json!(90)));
        assert_eq!(snapshot.get("on"), Some(&json!(true)));
        assert_eq!(snapshot.iter().count(), 2);
    }

    #[test]
    fn should_use_action_as_group_snapshot() {
        let device = GatewayDevice::Group(GroupPayload {
            id: "1".to_string(),
            name: "Living room".to_string(),
            model: Some("Room".to_string()),
            action: json!({"on": false, "bri": 12}).into(),
        });
        assert_eq!(device.snapshot().get("bri"), Some(&json!(12)));
        assert_eq!(device.identity().to_string(), "groups-1");
    }

    #[test]
    fn should_map_unreachable_snapshot_to_disconnected() {
        let snapshot = Snapshot::from(json!({"on": true, "reachable": false}));
        assert_eq!(snapshot.status(), DeviceStatus::Disconnected);
    }

    #[test]
    fn should_map_reachable_or_missing_flag_to_ready() {
        let reachable = Snapshot::from(json!({"reachable": true}));
        let missing = Snapshot::from(json!({"on": true}));
        assert_eq!(reachable.status(), DeviceStatus::Ready);
        assert_eq!(missing.status(), DeviceStatus::Ready);
    }

    #[test]
    fn should_treat_non_object_payload_as_empty_snapshot() {
        assert!(Snapshot::from(json!(null)).is_empty());
    }

    #[test]
    fn should_only_allow_writes_to_lights_and_groups() {
        assert!(DeviceType::Lights.is_writable());
        assert!(DeviceType::Groups.is_writable());
        assert!(!DeviceType::Sensors.is_writable());
    }
}
