//! Gateway link — start and stop the mirror of one gateway session.
//!
//! Starting performs a full publish, subscribes to command topics, spawns
//! the [`PollLoop`] worker and schedules the recurring poll tick. The
//! returned [`LinkHandle`] is the only way to stop it again.

use std::sync::Arc;

use huemqtt_domain::error::HueMqttError;
use huemqtt_domain::property::PropertyTable;
use huemqtt_domain::topic::TopicLayout;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::LinkConfig;
use crate::ports::{GatewaySession, MessageBus};
use crate::scheduler::Scheduler;
use crate::services::poll_loop::{LinkEvent, PollLoop};
use crate::services::translator::Translator;

/// Pending work items; extra ticks are dropped while the worker is busy.
const EVENT_QUEUE_CAPACITY: usize = 4;

/// A running link. Drop aborts the poll tick but leaves the worker to exit
/// on its own; call [`stop`](Self::stop) for an orderly shutdown.
pub struct LinkHandle<B> {
    bus: Arc<B>,
    command_filter: String,
    events: mpsc::Sender<LinkEvent>,
    shutdown: watch::Sender<bool>,
    scheduler: Scheduler,
    worker: JoinHandle<()>,
}

/// Publish every device of `session` and start mirroring it.
///
/// # Errors
///
/// Returns an error when the command subscription cannot be created. The
/// full publish itself never fails; per-type failures are logged.
pub async fn start<B, S>(
    config: &LinkConfig,
    bus: Arc<B>,
    session: Arc<S>,
    properties: Arc<PropertyTable>,
) -> Result<LinkHandle<B>, HueMqttError>
where
    B: MessageBus + 'static,
    S: GatewaySession + 'static,
{
    let (shutdown, shutdown_rx) = watch::channel(false);
    let layout = TopicLayout::new(config.base_topic.as_str());
    let command_filter = layout.command_filter();

    let mut translator = Translator::new(Arc::clone(&bus), properties, layout)
        .with_debug(config.debug)
        .with_shutdown(shutdown_rx.clone());
    translator.publish_all(&*session).await;

    let commands = bus.subscribe(&command_filter).await?;
    tracing::info!(filter = %command_filter, "listening for commands");

    let (events, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let worker = tokio::spawn(
        PollLoop::new(translator, session, events_rx, commands, shutdown_rx).run(),
    );

    let mut scheduler = Scheduler::new();
    let ticks = events.clone();
    scheduler.every("poll", config.polling_interval, move || {
        let ticks = ticks.clone();
        async move {
            if ticks.try_send(LinkEvent::Tick).is_err() {
                tracing::trace!("poll tick skipped, worker busy");
            }
        }
    });

    Ok(LinkHandle {
        bus,
        command_filter,
        events,
        shutdown,
        scheduler,
        worker,
    })
}

impl<B: MessageBus> LinkHandle<B> {
    /// Whether the worker is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Queue a full publish of every device. Returns `false` when the worker
    /// is gone or its queue is full.
    pub fn request_republish(&self) -> bool {
        self.events.try_send(LinkEvent::Republish).is_ok()
    }

    /// Stop the tick, signal the worker, unsubscribe, and wait for the
    /// worker to finish the operation it is running.
    pub async fn stop(mut self) {
        self.scheduler.cancel_all();
        let _ = self.shutdown.send(true);
        if let Err(err) = self.bus.unsubscribe(&self.command_filter).await {
            tracing::debug!(error = %err, "unsubscribe failed during stop");
        }
        if let Err(err) = self.worker.await {
            tracing::warn!(error = %err, "poll worker ended abnormally");
        }
        tracing::info!("gateway link stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeBus, FakeSession, light};
    use huemqtt_domain::device::DeviceType;
    use serde_json::json;
    use std::time::Duration;

    fn config(polling_interval: Duration) -> LinkConfig {
        LinkConfig {
            polling_interval,
            ..LinkConfig::default()
        }
    }

    async fn started(polling_interval: Duration) -> (Arc<FakeBus>, FakeSession, LinkHandle<FakeBus>) {
        let bus = Arc::new(FakeBus::new());
        let session = FakeSession::new();
        session.set_devices(DeviceType::Lights, vec![light("1", "Desk", json!({"on": false}))]);
        let handle = start(
            &config(polling_interval),
            Arc::clone(&bus),
            Arc::new(session.clone()),
            Arc::new(PropertyTable::curated()),
        )
        .await
        .unwrap();
        (bus, session, handle)
    }

    #[tokio::test]
    async fn should_publish_and_subscribe_on_start() {
        let (bus, _session, handle) = started(Duration::from_secs(60)).await;

        assert_eq!(bus.payloads_for("homie/lights-1/lights/on"), vec!["false"]);
        assert_eq!(bus.subscriptions(), vec!["homie/+/+/+/set".to_string()]);
        assert!(handle.is_running());
        handle.stop().await;
    }

    #[tokio::test]
    async fn should_publish_changes_on_every_tick() {
        let (bus, session, handle) = started(Duration::from_millis(10)).await;
        bus.clear();

        session.set_devices(DeviceType::Lights, vec![light("1", "Desk", json!({"on": true}))]);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(bus.payloads_for("homie/lights-1/lights/on"), vec!["true"]);
        handle.stop().await;
    }

    #[tokio::test]
    async fn should_stop_polling_and_unsubscribe_on_stop() {
        let (bus, session, handle) = started(Duration::from_millis(10)).await;

        handle.stop().await;
        let after_stop = session.enumerations();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(session.enumerations(), after_stop);
        assert_eq!(bus.unsubscribed(), vec!["homie/+/+/+/set".to_string()]);
        assert!(bus.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn should_republish_on_request() {
        let (bus, _session, handle) = started(Duration::from_secs(60)).await;
        bus.clear();

        assert!(handle.request_republish());
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(bus.payloads_for("homie/lights-1/$name"), vec!["Desk"]);
        handle.stop().await;
    }
}
