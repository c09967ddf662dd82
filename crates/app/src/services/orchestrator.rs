//! Orchestrator — pairing and connection state machine.
//!
//! ```text
//! Unpaired ─┬─ no address, discovery on ──▶ Discovering ──(found)──┐
//!           ├─ address, no credential ───▶ AwaitingButtonPress ◀──┘
//!           └─ address + credential ─────▶ PairedDisconnected ◀── (paired)
//!                                              │ session verified, bus up
//!                                              ▼
//!                                          Connected ── bus lost ──▶ Unpaired
//! ```
//!
//! Every failing step is retried after [`RETRY_DELAY`]; there is no backoff.
//! Only the orchestrator mutates the connection state and the credential.

use std::sync::Arc;
use std::time::Duration;

use huemqtt_domain::connection::ConnectionState;
use huemqtt_domain::credential::PairingCredential;
use huemqtt_domain::device::DeviceType;
use huemqtt_domain::error::HueMqttError;
use huemqtt_domain::property::PropertyTable;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{APP_NAME, LinkConfig, RETRY_DELAY};
use crate::ports::{CredentialSink, GatewayClient, GatewaySession, MessageBus};
use crate::services::link::{self, LinkHandle};

/// Drives one gateway from first contact to a running link.
pub struct Orchestrator<G: GatewayClient, B, C> {
    config: LinkConfig,
    gateway: G,
    bus: Arc<B>,
    sink: C,
    properties: Arc<PropertyTable>,
    state: ConnectionState,
    address: Option<String>,
    credential: Option<PairingCredential>,
    session: Option<Arc<G::Session>>,
    link: Option<LinkHandle<B>>,
}

impl<G, B, C> Orchestrator<G, B, C>
where
    G: GatewayClient,
    B: MessageBus + 'static,
    C: CredentialSink,
{
    /// Create an orchestrator in [`ConnectionState::Unpaired`].
    pub fn new(
        config: LinkConfig,
        gateway: G,
        bus: Arc<B>,
        sink: C,
        properties: Arc<PropertyTable>,
    ) -> Self {
        Self {
            address: config.address(),
            credential: config.credential(),
            config,
            gateway,
            bus,
            sink,
            properties,
            state: ConnectionState::Unpaired,
            session: None,
            link: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn credential(&self) -> Option<&PairingCredential> {
        self.credential.as_ref()
    }

    /// The running link, while [`ConnectionState::Connected`].
    #[must_use]
    pub fn link(&self) -> Option<&LinkHandle<B>> {
        self.link.as_ref()
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            tracing::info!(from = %self.state, to = %next, "connection state changed");
            self.state = next;
        }
    }

    /// Where the known address and credential lead.
    fn evaluate(&self) -> ConnectionState {
        match (&self.address, &self.credential) {
            (Some(_), Some(_)) => ConnectionState::PairedDisconnected,
            (Some(_), None) => ConnectionState::AwaitingButtonPress,
            (None, _) if self.config.discover => ConnectionState::Discovering,
            (None, _) => ConnectionState::Unpaired,
        }
    }

    /// Run the action of the current state once. Returns how long to wait
    /// before the next step.
    pub async fn step(&mut self) -> Duration {
        match self.state {
            ConnectionState::Unpaired => self.restart(),
            ConnectionState::Discovering => self.discover().await,
            ConnectionState::AwaitingButtonPress => self.pair().await,
            ConnectionState::PairedDisconnected => self.connect().await,
            ConnectionState::Connected => self.supervise().await,
        }
    }

    fn restart(&mut self) -> Duration {
        let next = self.evaluate();
        if next == ConnectionState::Unpaired {
            tracing::error!("disabled discover and no gateway specified");
            return RETRY_DELAY;
        }
        self.transition(next);
        Duration::ZERO
    }

    async fn discover(&mut self) -> Duration {
        match self.gateway.discover().await {
            Ok(addresses) => {
                if let Some(address) = addresses.into_iter().next() {
                    tracing::info!(%address, "gateway found");
                    if self.credential.is_none() {
                        self.credential = self.config.credential_for(&address);
                    }
                    self.address = Some(address);
                    let next = self.evaluate();
                    self.transition(next);
                    return Duration::ZERO;
                }
                tracing::warn!("no gateway found on the network");
            }
            Err(err) => tracing::warn!(error = %err, "gateway discovery failed"),
        }
        RETRY_DELAY
    }

    async fn pair(&mut self) -> Duration {
        let Some(address) = self.address.clone() else {
            return self.restart();
        };
        match self
            .gateway
            .pair(&address, APP_NAME, &self.config.client_id)
            .await
        {
            Ok(credential) => {
                tracing::info!(%address, username = %credential.username, "paired with gateway");
                if let Err(err) = self.sink.persist(&credential).await {
                    tracing::error!(error = %err, "failed to persist pairing credential");
                }
                self.credential = Some(credential);
                self.transition(ConnectionState::PairedDisconnected);
                return Duration::ZERO;
            }
            Err(HueMqttError::LinkButtonNotPressed) => {
                tracing::warn!(%address, "press the link button on the gateway to pair");
            }
            Err(err) => tracing::warn!(%address, error = %err, "pairing failed"),
        }
        RETRY_DELAY
    }

    async fn connect(&mut self) -> Duration {
        let Some(credential) = self.credential.clone() else {
            return self.restart();
        };
        let address = credential.gateway_address.as_str();

        let session = match self.gateway.connect(&credential).await {
            Ok(session) => Arc::new(session),
            Err(err) => {
                tracing::warn!(%address, error = %err, "gateway connection failed");
                return RETRY_DELAY;
            }
        };
        if let Err(err) = session.enumerate(DeviceType::Groups).await {
            tracing::warn!(%address, error = %err, "gateway session verification failed");
            return RETRY_DELAY;
        }
        if !self.bus.is_connected() {
            tracing::info!("gateway reachable, waiting for the message bus");
            return RETRY_DELAY;
        }

        match link::start(
            &self.config,
            Arc::clone(&self.bus),
            Arc::clone(&session),
            Arc::clone(&self.properties),
        )
        .await
        {
            Ok(handle) => {
                tracing::info!(%address, "gateway link running");
                self.session = Some(session);
                self.link = Some(handle);
                self.transition(ConnectionState::Connected);
            }
            Err(err) => tracing::warn!(error = %err, "failed to start gateway link"),
        }
        RETRY_DELAY
    }

    async fn supervise(&mut self) -> Duration {
        let bus_up = self.bus.is_connected();
        let worker_up = self.link.as_ref().is_some_and(LinkHandle::is_running);
        if bus_up && worker_up {
            return RETRY_DELAY;
        }
        if bus_up {
            tracing::warn!("gateway link stopped unexpectedly, restarting");
        } else {
            tracing::warn!("message bus disconnected, restarting");
        }
        self.teardown().await;
        self.transition(ConnectionState::Unpaired);
        RETRY_DELAY
    }

    /// Ask a running link for a full publish of every device.
    pub fn request_republish(&self) -> bool {
        self.link.as_ref().is_some_and(LinkHandle::request_republish)
    }

    async fn teardown(&mut self) {
        if let Some(link) = self.link.take() {
            link.stop().await;
        }
        self.session = None;
    }

    /// Step until `shutdown` turns `true` or its sender is dropped, then stop
    /// the link.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("orchestrator started");
        while !*shutdown.borrow() {
            let delay = self.step().await;
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        self.teardown().await;
        if self.state.is_connected() {
            self.transition(ConnectionState::PairedDisconnected);
        }
        tracing::info!("orchestrator stopped");
    }

    /// Run on a background task.
    pub fn spawn(self) -> OrchestratorHandle
    where
        G: 'static,
        C: 'static,
    {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        OrchestratorHandle { shutdown, task }
    }
}

/// Start/stop surface of a spawned [`Orchestrator`].
pub struct OrchestratorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl OrchestratorHandle {
    /// Signal shutdown and wait for the link to stop.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "orchestrator task failed");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
