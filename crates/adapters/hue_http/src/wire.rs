//! JSON shapes of the gateway REST API and their conversion into domain
//! payloads.

use std::cmp::Ordering;

use huemqtt_domain::device::{
    DeviceType, GatewayDevice, GroupPayload, LightPayload, SensorPayload,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::HueError;

/// One gateway listed by the discovery endpoint.
#[derive(Debug, Deserialize)]
pub struct DiscoveryEntry {
    #[serde(rename = "internalipaddress")]
    pub internal_ip_address: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    kind: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ResponseEntry {
    #[serde(default)]
    success: Option<Value>,
}

/// Credential issued by a successful pairing.
#[derive(Debug, Deserialize)]
pub struct PairSuccess {
    pub username: String,
    #[serde(default)]
    pub clientkey: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLight {
    name: String,
    #[serde(default)]
    modelid: Option<String>,
    #[serde(default)]
    state: Value,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    action: Value,
}

#[derive(Debug, Deserialize)]
struct RawSensor {
    name: String,
    #[serde(default)]
    modelid: Option<String>,
    #[serde(default)]
    state: Value,
    #[serde(default)]
    config: Value,
}

/// The first `{"error": ...}` entry of a response list, if any.
pub fn first_error(value: &Value) -> Option<HueError> {
    value
        .as_array()?
        .iter()
        .filter_map(|entry| entry.get("error"))
        .find_map(|error| serde_json::from_value::<ApiErrorBody>(error.clone()).ok())
        .map(|body| HueError::Api {
            kind: body.kind,
            description: body.description,
        })
}

/// Extract the issued credential from a pairing response.
pub fn parse_pairing(value: Value) -> Result<PairSuccess, HueError> {
    if let Some(err) = first_error(&value) {
        return Err(err);
    }
    let entries: Vec<ResponseEntry> = serde_json::from_value(value)
        .map_err(|err| HueError::UnexpectedResponse(err.to_string()))?;
    let success = entries
        .into_iter()
        .find_map(|entry| entry.success)
        .ok_or_else(|| HueError::UnexpectedResponse("pairing returned no entry".to_string()))?;
    serde_json::from_value(success).map_err(|err| HueError::UnexpectedResponse(err.to_string()))
}

/// Numeric ids in numeric order, anything else after them by text.
fn id_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Convert an id-keyed collection response into device payloads, ordered
/// by id. Entries that cannot be parsed are logged and skipped.
pub fn parse_devices(device_type: DeviceType, value: Value) -> Result<Vec<GatewayDevice>, HueError> {
    if let Some(err) = first_error(&value) {
        return Err(err);
    }
    let Value::Object(map) = value else {
        return Err(HueError::UnexpectedResponse(format!(
            "expected an object of {device_type}"
        )));
    };
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| id_order(a, b));
    Ok(entries
        .into_iter()
        .filter_map(|(id, raw)| match parse_device(device_type, id.clone(), raw) {
            Ok(device) => Some(device),
            Err(err) => {
                tracing::warn!(%device_type, %id, error = %err, "skipping malformed device");
                None
            }
        })
        .collect())
}

fn parse_device(device_type: DeviceType, id: String, raw: Value) -> Result<GatewayDevice, HueError> {
    let unexpected =
        |err: serde_json::Error| HueError::UnexpectedResponse(format!("{device_type} {id}: {err}"));
    let device = match device_type {
        DeviceType::Lights => {
            let light: RawLight = serde_json::from_value(raw).map_err(unexpected)?;
            GatewayDevice::Light(LightPayload {
                id,
                name: light.name,
                model: light.modelid,
                state: light.state.into(),
            })
        }
        DeviceType::Groups => {
            let group: RawGroup = serde_json::from_value(raw).map_err(unexpected)?;
            GatewayDevice::Group(GroupPayload {
                id,
                name: group.name,
                model: group.kind,
                action: group.action.into(),
            })
        }
        DeviceType::Sensors => {
            let sensor: RawSensor = serde_json::from_value(raw).map_err(unexpected)?;
            GatewayDevice::Sensor(SensorPayload {
                id,
                name: sensor.name,
                model: sensor.modelid,
                state: sensor.state.into(),
                config: sensor.config.into(),
            })
        }
    };
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_order_devices_by_numeric_id() {
        let body = json!({
            "10": {"name": "Ten", "state": {"on": true}},
            "2": {"name": "Two", "state": {"on": false}},
            "1": {"name": "One", "modelid": "LCT015", "state": {"on": true}},
        });
        let devices = parse_devices(DeviceType::Lights, body).unwrap();
        let ids: Vec<String> = devices.iter().map(|d| d.identity().gateway_id).collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
        assert_eq!(devices[0].model(), Some("LCT015"));
    }

    #[test]
    fn should_use_group_type_as_model() {
        let body = json!({"1": {"name": "Kitchen", "type": "Room", "action": {"on": false}}});
        let devices = parse_devices(DeviceType::Groups, body).unwrap();
        assert_eq!(devices[0].model(), Some("Room"));
        assert_eq!(devices[0].snapshot().get("on"), Some(&json!(false)));
    }

    #[test]
    fn should_keep_sensor_state_and_config_apart() {
        let body = json!({"4": {
            "name": "Motion",
            "modelid": "SML001",
            "state": {"presence": true},
            "config": {"battery": 80, "on": true},
        }});
        let devices = parse_devices(DeviceType::Sensors, body).unwrap();
        let GatewayDevice::Sensor(sensor) = &devices[0] else {
            panic!("expected a sensor");
        };
        assert_eq!(sensor.state.get("presence"), Some(&json!(true)));
        assert_eq!(sensor.config.get("battery"), Some(&json!(80)));
    }

    #[test]
    fn should_surface_error_entries() {
        let body = json!([{"error": {"type": 1, "address": "/lights", "description": "unauthorized user"}}]);
        let err = parse_devices(DeviceType::Lights, body).unwrap_err();
        assert!(matches!(err, HueError::Api { kind: 1, .. }));
    }

    #[test]
    fn should_skip_device_without_name_and_keep_the_others() {
        let body = json!({
            "1": {"name": "Desk", "state": {"on": true}},
            "2": {"state": {"on": false}},
            "3": {"name": "Lamp", "state": {"on": false}},
        });

        let devices = parse_devices(DeviceType::Lights, body).unwrap();

        let ids: Vec<String> = devices.iter().map(|d| d.identity().to_string()).collect();
        assert_eq!(ids, vec!["lights-1", "lights-3"]);
    }

    #[test]
    fn should_parse_pairing_success_with_client_key() {
        let body = json!([{"success": {"username": "abc", "clientkey": "KEY"}}]);
        let success = parse_pairing(body).unwrap();
        assert_eq!(success.username, "abc");
        assert_eq!(success.clientkey.as_deref(), Some("KEY"));
    }

    #[test]
    fn should_parse_link_button_error() {
        let body = json!([{"error": {"type": 101, "address": "", "description": "link button not pressed"}}]);
        let err = parse_pairing(body).unwrap_err();
        assert!(matches!(err, HueError::Api { kind: 101, .. }));
    }
}
