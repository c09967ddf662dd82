//! Application services — use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod device_cache;
pub mod link;
pub mod orchestrator;
pub mod poll_loop;
pub mod translator;

pub use device_cache::DeviceCache;
pub use link::LinkHandle;
pub use orchestrator::{Orchestrator, OrchestratorHandle};
pub use poll_loop::{LinkEvent, PollLoop};
pub use translator::{CommandOutcome, RejectReason, Translator};
