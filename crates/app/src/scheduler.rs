//! Recurring background tasks owned by one component.
//!
//! Every task runs on its own tokio task and is aborted when the owning
//! [`Scheduler`] is cancelled or dropped, so nothing keeps firing after the
//! component that scheduled it has stopped.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

struct ScheduledTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Owns a set of periodic tasks.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` every `period`, first after one full period.
    ///
    /// Ticks missed while `task` runs are delayed, never burst.
    pub fn every<F, Fut>(&mut self, name: &'static str, period: Duration, mut task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task().await;
            }
        });
        tracing::debug!(task = name, ?period, "scheduled recurring task");
        self.tasks.push(ScheduledTask { name, handle });
    }

    /// Number of tasks still scheduled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.iter().filter(|t| !t.handle.is_finished()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort every task.
    pub fn cancel_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.handle.abort();
            tracing::debug!(task = task.name, "cancelled recurring task");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
