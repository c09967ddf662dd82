//! # huemqtt-adapter-mqtt
//!
//! MQTT adapter — the production [`MessageBus`](huemqtt_app::ports::MessageBus).
//!
//! ## How it works
//!
//! A background task drives the rumqttc event loop. It tracks the broker
//! connection, routes incoming publishes to local subscriptions by topic
//! filter, and re-subscribes every active filter after each reconnect
//! (sessions are clean, so the broker forgets them).
//!
//! | Event | Effect |
//! |-------|--------|
//! | `ConnAck` (accepted) | connected, re-subscribe all filters |
//! | `Publish` | delivered to every matching subscription |
//! | connection error | disconnected, retry after 5 s |
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `huemqtt-app` and `huemqtt-domain`.

mod bus;
mod config;
mod error;

pub use bus::MqttBus;
pub use config::MqttConfig;
pub use error::MqttError;
