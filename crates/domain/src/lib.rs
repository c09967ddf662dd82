//! # huemqtt-domain
//!
//! Pure domain model for the huemqtt gateway bridge.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, connection state, credentials
//! - Define **device identities** (`lights-5`, `sensors-12`, …) and the raw
//!   gateway payloads they come from, with one snapshot extraction per type
//! - Define the **managed property table**: which gateway fields are exposed
//!   on the bus, with their metadata and settability
//! - Define **property values** and the text coercion used for inbound commands
//! - Define the **topic layout** of the device-discovery convention
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod connection;
pub mod credential;
pub mod device;
pub mod error;
pub mod property;
pub mod topic;
