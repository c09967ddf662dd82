//! Managed properties — the whitelist of gateway fields exposed on the bus.
//!
//! The [`PropertyTable`] is built once at startup and injected into the
//! translator. It decides which snapshot keys become property topics, which
//! metadata is published for them, and whether inbound writes are accepted.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// Text format of gateway timestamps (`lastupdated`).
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Data type tag published under `<property>/$datatype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Boolean,
    Integer,
    String,
    DateTime,
}

impl DataType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::String => "string",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed metadata attached to one managed property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub display_name: String,
    pub datatype: DataType,
    pub settable: bool,
    pub unit: Option<String>,
    /// Numeric range in `min:max` form.
    pub format: Option<String>,
}

impl PropertyDescriptor {
    /// A read-only descriptor without unit or format.
    #[must_use]
    pub fn new(display_name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            display_name: display_name.into(),
            datatype,
            settable: false,
            unit: None,
            format: None,
        }
    }

    #[must_use]
    pub fn settable(mut self) -> Self {
        self.settable = true;
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Metadata sub-topics and their payloads, in publication order.
    ///
    /// `$unit` and `$format` are only present when set.
    #[must_use]
    pub fn metadata(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("$name", self.display_name.clone()),
            ("$datatype", self.datatype.to_string()),
            ("$settable", self.settable.to_string()),
        ];
        if let Some(unit) = &self.unit {
            fields.push(("$unit", unit.clone()));
        }
        if let Some(format) = &self.format {
            fields.push(("$format", format.clone()));
        }
        fields
    }
}

/// Immutable lookup from property name to descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTable {
    entries: BTreeMap<String, PropertyDescriptor>,
}

impl PropertyTable {
    /// An empty table, to be filled with [`with`](Self::with).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) one entry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        self.entries.insert(name.into(), descriptor);
        self
    }

    /// The hand-curated table of gateway fields exposed by the bridge.
    #[must_use]
    pub fn curated() -> Self {
        use DataType::{Boolean, DateTime, Integer};

        Self::new()
            .with("on", PropertyDescriptor::new("On", Boolean).settable())
            .with(
                "bri",
                PropertyDescriptor::new("Brightness", Integer)
                    .settable()
                    .format("1:254"),
            )
            .with(
                "ct",
                PropertyDescriptor::new("Color temperature", Integer)
                    .settable()
                    .unit("mired")
                    .format("153:500"),
            )
            .with(
                "hue",
                PropertyDescriptor::new("Hue", Integer)
                    .settable()
                    .format("0:65535"),
            )
            .with(
                "sat",
                PropertyDescriptor::new("Saturation", Integer)
                    .settable()
                    .format("0:254"),
            )
            .with("alert", PropertyDescriptor::new("Alert", DataType::String).settable())
            .with("effect", PropertyDescriptor::new("Effect", DataType::String).settable())
            .with("colormode", PropertyDescriptor::new("Color mode", DataType::String))
            .with("status", PropertyDescriptor::new("Status", Integer))
            .with("buttonevent", PropertyDescriptor::new("Button event", Integer))
            .with(
                "battery",
                PropertyDescriptor::new("Battery", Integer)
                    .unit("%")
                    .format("0:100"),
            )
            .with("lastupdated", PropertyDescriptor::new("Last updated", DateTime))
            .with("presence", PropertyDescriptor::new("Presence", Boolean))
            .with("daylight", PropertyDescriptor::new("Daylight", Boolean))
            .with("lightlevel", PropertyDescriptor::new("Light level", Integer))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A typed scalar value of a managed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    String(String),
    DateTime(NaiveDateTime),
}

impl PropertyValue {
    /// Convert a gateway-reported JSON value, guided by the descriptor's
    /// data type.
    ///
    /// Non-integral numbers keep their textual form. Arrays, objects and
    /// nulls are not exposable and yield `None`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value, datatype: DataType) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => Some(
                n.as_i64()
                    .map_or_else(|| Self::String(n.to_string()), Self::Int),
            ),
            serde_json::Value::String(s) if datatype == DataType::DateTime => Some(
                NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
                    .map_or_else(|_| Self::String(s.clone()), Self::DateTime),
            ),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }

    /// Best-guess typing of an inbound text payload: all digits is an
    /// integer, exactly `true`/`false` is a boolean, anything else stays a
    /// string.
    #[must_use]
    pub fn coerce(payload: &str) -> Self {
        if !payload.is_empty() && payload.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = payload.parse() {
                return Self::Int(n);
            }
        }
        match payload {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            other => Self::String(other.to_string()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}
