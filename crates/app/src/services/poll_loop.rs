//! Poll worker — the single task that owns the translator.
//!
//! Poll ticks, full re-publish requests and inbound commands all arrive on
//! channels and are handled one at a time, so a command never interleaves
//! with a diff pass on the same cache.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::ports::{GatewaySession, MessageBus, Subscription};
use crate::services::translator::Translator;

/// Work items fed to the worker besides inbound commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Run a diff pass.
    Tick,
    /// Run a full publish.
    Republish,
}

/// Serializes every translator operation for one gateway session.
pub struct PollLoop<B, S> {
    translator: Translator<B>,
    session: Arc<S>,
    events: mpsc::Receiver<LinkEvent>,
    commands: Subscription,
    shutdown: watch::Receiver<bool>,
}

impl<B, S> PollLoop<B, S>
where
    B: MessageBus,
    S: GatewaySession,
{
    pub fn new(
        translator: Translator<B>,
        session: Arc<S>,
        events: mpsc::Receiver<LinkEvent>,
        commands: Subscription,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            translator,
            session,
            events,
            commands,
            shutdown,
        }
    }

    /// Handle work until shutdown is signalled or an input channel closes.
    ///
    /// An operation already running when shutdown is signalled completes;
    /// the translator discards its result.
    pub async fn run(mut self) {
        tracing::debug!("poll worker started");
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                event = self.events.recv() => match event {
                    Some(LinkEvent::Tick) => {
                        self.translator.poll_changes(&*self.session).await;
                    }
                    Some(LinkEvent::Republish) => {
                        self.translator.publish_all(&*self.session).await;
                    }
                    None => break,
                },
                message = self.commands.recv() => match message {
                    Some(message) => {
                        self.translator.handle_command(&*self.session, &message).await;
                    }
                    None => {
                        tracing::warn!("command subscription closed");
                        break;
                    }
                },
            }
        }
        tracing::debug!("poll worker stopped");
    }
}
