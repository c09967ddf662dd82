//! # huemqttd — Hue to MQTT bridge daemon
//!
//! Composition root that wires the adapters together and runs the gateway
//! link until interrupted.
//!
//! ## Responsibilities
//! - Load configuration (CLI argument, config file, env vars, saved credential)
//! - Initialise logging
//! - Start the MQTT bus and the gateway REST client
//! - Run the pairing/connection orchestrator, persisting new credentials
//!   next to the config file
//! - Stop the link and disconnect from the broker on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

use std::path::PathBuf;
use std::sync::Arc;

use huemqtt_adapter_hue::HueClient;
use huemqtt_adapter_mqtt::MqttBus;
use huemqtt_app::services::Orchestrator;
use huemqtt_domain::property::PropertyTable;
use huemqttd::config::{Config, DEFAULT_CONFIG_PATH};
use huemqttd::credentials::FileCredentialStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "starting huemqttd"
    );

    let bus = Arc::new(MqttBus::connect(&config.mqtt));
    let gateway = HueClient::new(config.hue.http.clone())?;
    let store = FileCredentialStore::beside(&config_path);

    let orchestrator = Orchestrator::new(
        config.link_config(),
        gateway,
        Arc::clone(&bus),
        store,
        Arc::new(PropertyTable::curated()),
    );
    let handle = orchestrator.spawn();

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.stop().await;
    bus.disconnect().await;

    Ok(())
}
