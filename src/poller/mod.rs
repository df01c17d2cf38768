//! Timer-driven mailbox polling.
//!
//! The poller only detects unread mail. Whether a prompt runs, waits, or is
//! dropped is decided by the [`Dispatcher`] it forwards to.

mod prompt;

pub use prompt::{INBOX_TEMPLATE, render_inbox};

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    bus::{MessageBus, domain::AgentId},
    dispatch::Dispatcher,
};

/// Per-worker polling timers feeding a [`Dispatcher`].
///
/// Delivery is at most once: messages are marked read when collected and
/// are not re-queued if forwarding fails.
pub struct MessagePoller {
    bus: Arc<MessageBus>,
    dispatcher: Arc<dyn Dispatcher>,
    interval: Duration,
    stopped: AtomicBool,
    in_flight: AtomicUsize,
    timers: Mutex<HashMap<AgentId, JoinHandle<()>>>,
}

impl MessagePoller {
    /// Creates a poller ticking every `interval`.
    #[must_use]
    pub fn new(bus: Arc<MessageBus>, dispatcher: Arc<dyn Dispatcher>, interval: Duration) -> Self {
        Self {
            bus,
            dispatcher,
            interval,
            stopped: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` after [`Self::stop_all`].
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of timer-triggered forwards that have not returned yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns `true` while a timer runs for `worker`.
    #[must_use]
    pub fn is_polling(&self, worker: &AgentId) -> bool {
        self.timers().contains_key(worker)
    }

    /// Reads and marks read all unread mail for `worker` and renders it as
    /// one prompt.
    ///
    /// Returns `None` when stopped or when the mailbox has nothing unread.
    pub fn collect(&self, worker: &AgentId) -> Option<String> {
        if self.is_stopped() || !self.bus.has_unread_messages(worker) {
            return None;
        }
        let messages = self.bus.read_messages(worker, true);
        if messages.is_empty() {
            return None;
        }
        match render_inbox(&messages) {
            Ok(prompt) => {
                debug!(worker = %worker, count = messages.len(), "collected unread mail");
                Some(prompt)
            }
            Err(err) => {
                warn!(worker = %worker, error = %err, "failed to render inbox prompt");
                None
            }
        }
    }

    /// Hands `prompt` to the dispatcher, logging any failure.
    #[instrument(skip_all, fields(worker = %worker))]
    pub async fn forward(&self, worker: &AgentId, prompt: String) {
        if let Err(err) = self.dispatcher.dispatch(worker, prompt).await {
            warn!(
                worker = %worker,
                fatal = err.is_fatal(),
                error = %err,
                "message delivery failed; messages were already consumed"
            );
        }
    }

    /// Runs one poll for `worker` and awaits the forward.
    ///
    /// Returns `true` when a prompt was forwarded.
    pub async fn tick(&self, worker: &AgentId) -> bool {
        let Some(prompt) = self.collect(worker) else {
            return false;
        };
        self.forward(worker, prompt).await;
        true
    }

    /// Starts the periodic timer for `worker`, replacing any previous one.
    ///
    /// Forwards run on their own tasks so a slow backend turn never delays
    /// the next tick. Does nothing once the poller is stopped. Must be
    /// called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>, worker: &AgentId) {
        if self.is_stopped() {
            return;
        }
        let poller = Arc::clone(self);
        let id = worker.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(poller.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if poller.is_stopped() {
                    break;
                }
                // Counted before collecting so consumed mail is never
                // invisible to completion checks.
                poller.in_flight.fetch_add(1, Ordering::SeqCst);
                let Some(prompt) = poller.collect(&id) else {
                    poller.in_flight.fetch_sub(1, Ordering::SeqCst);
                    continue;
                };
                let forwarder = Arc::clone(&poller);
                let target = id.clone();
                tokio::spawn(async move {
                    forwarder.forward(&target, prompt).await;
                    forwarder.in_flight.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });
        if let Some(previous) = self.timers().insert(worker.clone(), handle) {
            previous.abort();
        }
        debug!(worker = %worker, interval_ms = self.interval.as_millis(), "polling started");
    }

    /// Stops the timer for `worker`. Returns `false` when none was running.
    pub fn stop(&self, worker: &AgentId) -> bool {
        let Some(handle) = self.timers().remove(worker) else {
            return false;
        };
        handle.abort();
        debug!(worker = %worker, "polling stopped");
        true
    }

    /// Stops every timer. Idempotent.
    pub fn stop_all(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let timers: Vec<_> = self.timers().drain().collect();
        for (_, handle) in &timers {
            handle.abort();
        }
        info!(timers = timers.len(), "message poller stopped");
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<AgentId, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MessagePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePoller")
            .field("interval", &self.interval)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
