//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HueMqttError`]
//! at port boundaries. External failures (gateway, bus) are carried as boxed
//! sources so the domain stays free of IO crates.

/// Top-level error crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum HueMqttError {
    /// Input failed a domain invariant (malformed topic, payload, identity).
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The gateway refused pairing because its link button was not pressed.
    #[error("link button not pressed")]
    LinkButtonNotPressed,

    /// The gateway client failed.
    #[error("gateway error")]
    Gateway(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The message bus failed.
    #[error("message bus error")]
    Bus(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Persisting data outside the process failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Reasons a value fails domain validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown device type {0:?}")]
    UnknownDeviceType(String),

    #[error("device id {0:?} is not of the form <type>-<id>")]
    MalformedDeviceId(String),

    #[error("topic {0:?} does not match the command pattern")]
    MalformedTopic(String),

    #[error("node {node:?} does not match device type {device_type:?}")]
    NodeMismatch { node: String, device_type: String },

    #[error("payload is not valid UTF-8")]
    NonUtf8Payload,
}

/// A lookup that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of thing looked up (e.g. `"Device"`, `"Property"`).
    pub entity: &'static str,
    /// The identifier that was not found.
    pub id: String,
}
