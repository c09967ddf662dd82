//! Device cache — the last published state of every exposed device.
//!
//! Owned exclusively by the translator. A property key is only ever present
//! after its value has been published at least once.

use std::collections::BTreeMap;

use huemqtt_domain::device::{CachedDevice, DeviceIdentity, DeviceStatus, DeviceType};
use huemqtt_domain::error::NotFoundError;
use huemqtt_domain::property::PropertyValue;

/// Keyed by `(device type, gateway id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCache {
    devices: BTreeMap<DeviceIdentity, CachedDevice>,
}

impl DeviceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale replace the entry for `device.identity`.
    /// Returns the replaced entry.
    pub fn upsert(&mut self, device: CachedDevice) -> Option<CachedDevice> {
        self.devices.insert(device.identity.clone(), device)
    }

    #[must_use]
    pub fn get(&self, identity: &DeviceIdentity) -> Option<&CachedDevice> {
        self.devices.get(identity)
    }

    #[must_use]
    pub fn contains(&self, identity: &DeviceIdentity) -> bool {
        self.devices.contains_key(identity)
    }

    #[must_use]
    pub fn property(&self, identity: &DeviceIdentity, name: &str) -> Option<&PropertyValue> {
        self.devices.get(identity)?.properties.get(name)
    }

    /// The cached value of `name`, or which of device and property is missing.
    ///
    /// # Errors
    ///
    /// Returns a [`NotFoundError`] for entity `"Device"` or `"Property"`.
    pub fn lookup(&self, identity: &DeviceIdentity, name: &str) -> Result<&PropertyValue, NotFoundError> {
        let device = self.devices.get(identity).ok_or_else(|| NotFoundError {
            entity: "Device",
            id: identity.to_string(),
        })?;
        device.properties.get(name).ok_or_else(|| NotFoundError {
            entity: "Property",
            id: format!("{identity}/{name}"),
        })
    }

    /// Record a published value. Returns `false` when the device is unknown.
    pub fn set_property(
        &mut self,
        identity: &DeviceIdentity,
        name: &str,
        value: PropertyValue,
    ) -> bool {
        match self.devices.get_mut(identity) {
            Some(device) => {
                device.properties.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Record a published status. Returns `false` when the device is unknown.
    pub fn set_status(&mut self, identity: &DeviceIdentity, status: DeviceStatus) -> bool {
        match self.devices.get_mut(identity) {
            Some(device) => {
                device.status = status;
                true
            }
            None => false,
        }
    }

    /// Drop every `device_type` entry whose identity is not in `seen`.
    /// Returns the removed identities.
    pub fn retain_seen(
        &mut self,
        device_type: DeviceType,
        seen: &[DeviceIdentity],
    ) -> Vec<DeviceIdentity> {
        let stale: Vec<DeviceIdentity> = self
            .devices
            .keys()
            .filter(|id| id.device_type == device_type && !seen.contains(id))
            .cloned()
            .collect();
        for id in &stale {
            self.devices.remove(id);
        }
        stale
    }

    /// Whether any device of `device_type` is cached.
    #[must_use]
    pub fn has_type(&self, device_type: DeviceType) -> bool {
        self.devices.keys().any(|id| id.device_type == device_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CachedDevice> {
        self.devices.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
