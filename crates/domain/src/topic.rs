//! Topic layout of the device-discovery convention.
//!
//! ```text
//! {prefix}/{type}-{id}/$homie | $name | $state | $nodes      (retained)
//! {prefix}/{type}-{id}/{type}/$name                           (retained)
//! {prefix}/{type}-{id}/{type}/$properties                     (comma-joined)
//! {prefix}/{type}-{id}/{type}/{property}                      (value)
//! {prefix}/{type}-{id}/{type}/{property}/{$metadata}          (descriptor)
//! {prefix}/{type}-{id}/{type}/{property}/set                  (inbound)
//! ```

use crate::device::DeviceIdentity;
use crate::error::ValidationError;

/// Convention version published under `$homie`.
pub const HOMIE_VERSION: &str = "4.0.0";

/// Last segment of inbound command topics.
pub const SET_SUFFIX: &str = "set";

/// Builds and parses topics under one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    prefix: String,
}

/// Where an inbound command is aimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTarget {
    pub identity: DeviceIdentity,
    pub property: String,
}

impl TopicLayout {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `{prefix}/{type}-{id}/{attribute}`
    #[must_use]
    pub fn device_attribute(&self, id: &DeviceIdentity, attribute: &str) -> String {
        format!("{}/{id}/{attribute}", self.prefix)
    }

    /// `{prefix}/{type}-{id}/{type}/{attribute}`
    #[must_use]
    pub fn node_attribute(&self, id: &DeviceIdentity, attribute: &str) -> String {
        format!("{}/{id}/{}/{attribute}", self.prefix, id.device_type)
    }

    /// `{prefix}/{type}-{id}/{type}/{property}`
    #[must_use]
    pub fn property(&self, id: &DeviceIdentity, property: &str) -> String {
        self.node_attribute(id, property)
    }

    /// `{prefix}/{type}-{id}/{type}/{property}/{attribute}`
    #[must_use]
    pub fn property_attribute(&self, id: &DeviceIdentity, property: &str, attribute: &str) -> String {
        format!("{}/{attribute}", self.property(id, property))
    }

    /// Subscription filter matching every command topic.
    #[must_use]
    pub fn command_filter(&self) -> String {
        format!("{}/+/+/+/{SET_SUFFIX}", self.prefix)
    }

    /// Extract the target device and property from an inbound topic.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the topic is outside the prefix,
    /// has the wrong shape, names an unknown device type, or addresses a node
    /// other than the device's type.
    pub fn parse_command(&self, topic: &str) -> Result<CommandTarget, ValidationError> {
        let malformed = || ValidationError::MalformedTopic(topic.to_string());

        let rest = topic
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(malformed)?;

        let segments: Vec<&str> = rest.split('/').collect();
        let [device, node, property, suffix] = segments.as_slice() else {
            return Err(malformed());
        };
        if *suffix != SET_SUFFIX || property.is_empty() || property.starts_with('$') {
            return Err(malformed());
        }

        let identity: DeviceIdentity = device.parse()?;
        if *node != identity.device_type.as_str() {
            return Err(ValidationError::NodeMismatch {
                node: (*node).to_string(),
                device_type: identity.device_type.to_string(),
            });
        }

        Ok(CommandTarget {
            identity,
            property: (*property).to_string(),
        })
    }
}
