//! # huemqtt-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `GatewayClient` / `GatewaySession` — discovery, pairing, enumeration, commands
//!   - `MessageBus` — publish, subscribe, connected-state query
//!   - `CredentialSink` — persistence of freshly obtained pairing credentials
//! - Provide the **gateway link** use-cases:
//!   - `DeviceCache` — last published values per device
//!   - `Translator` — full publish, diff pass, inbound command routing
//!   - `PollLoop` — the single worker serializing poll ticks and commands
//!   - `Orchestrator` — pairing/connection state machine with fixed retries
//! - Provide in-process infrastructure (`Scheduler`) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `huemqtt-domain` only (plus `tokio` for tasks, channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod config;
pub mod ports;
pub mod scheduler;
pub mod services;

#[cfg(test)]
pub(crate) mod fakes;
