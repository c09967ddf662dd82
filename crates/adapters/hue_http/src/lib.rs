//! # huemqtt-adapter-hue
//!
//! Hue gateway adapter — implements the gateway ports over the local REST
//! API (`/api/<username>/...`).
//!
//! ## Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | discover | `GET {discovery_url}` |
//! | pair | `POST /api` with `devicetype` and `generateclientkey` |
//! | connect | `GET /api/<username>/config` |
//! | enumerate | `GET /api/<username>/{lights,groups,sensors}` |
//! | light command | `PUT /api/<username>/lights/<id>/state` |
//! | group command | `PUT /api/<username>/groups/<id>/action` |
//!
//! The gateway answers errors with HTTP 200 and a list of `{"error": ...}`
//! entries; those are surfaced as [`HueError::Api`].
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `huemqtt-app` and `huemqtt-domain`.

mod client;
mod config;
mod error;
mod wire;

pub use client::{HueClient, HueSession};
pub use config::HueHttpConfig;
pub use error::HueError;
