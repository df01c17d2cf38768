//! Routes session streams and status changes to the selected sink.

use std::{
    collections::HashMap,
    io::Write,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use super::{
    adapters::{DirectoryChannelHost, InMemoryChannelHost},
    domain::ChannelStatus,
    ports::{ChannelError, ChannelHost, ChannelResult, StatusIndicator},
    sink::{ChannelSink, OutputSink, SharedStreamSink},
};
use crate::{
    backend::SessionEvent,
    bus::domain::AgentId,
    config::{OutputConfig, OutputMode},
    dispatch::WorkerProfile,
};

/// Output router owning one sink and the per-worker stream forwarders.
pub struct OutputRouter {
    sink: Arc<dyn OutputSink>,
    forwarders: Mutex<HashMap<AgentId, JoinHandle<()>>>,
}

impl OutputRouter {
    /// Creates a router over an explicit sink.
    #[must_use]
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            sink,
            forwarders: Mutex::new(HashMap::new()),
        }
    }

    /// Routes every worker to its own channel on `host`.
    #[must_use]
    pub fn with_channels(host: Arc<dyn ChannelHost>) -> Self {
        Self::new(Arc::new(ChannelSink::new(host)))
    }

    /// Routes every worker to `writer` with name prefixes.
    ///
    /// Writes happen synchronously on the forwarder task, so a slow
    /// `writer` blocks that task's runtime thread while a delta is written.
    #[must_use]
    pub fn with_shared_stream<W: Write + Send + 'static>(writer: W) -> Self {
        Self::new(Arc::new(SharedStreamSink::new(writer)))
    }

    /// Selects the sink described by `config`.
    ///
    /// `channels` without a directory keeps channels in memory; `auto`
    /// uses channels only when a directory is set and stdout otherwise.
    /// The stdout fallback writes with blocking `std::io` calls from the
    /// forwarder tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Io`] when the channel directory cannot be
    /// opened.
    pub fn from_config(config: &OutputConfig) -> ChannelResult<Self> {
        let router = match (config.mode, config.channel_dir.as_deref()) {
            (OutputMode::Channels | OutputMode::Auto, Some(dir)) => {
                info!(dir = %dir, "routing output to dedicated channels");
                Self::with_channels(Arc::new(DirectoryChannelHost::open(dir)?))
            }
            (OutputMode::Channels, None) => {
                info!("routing output to in-memory channels");
                Self::with_channels(Arc::new(InMemoryChannelHost::new()))
            }
            (OutputMode::Auto | OutputMode::Shared, _) => {
                info!("routing output to the shared stream");
                Self::with_shared_stream(std::io::stdout())
            }
        };
        Ok(router)
    }

    /// Opens output for a worker.
    ///
    /// # Errors
    ///
    /// Propagates sink creation failures.
    pub fn open(&self, profile: &WorkerProfile) -> ChannelResult<()> {
        self.sink.open(profile)
    }

    /// Forwards `events` to the worker's sink until the stream closes.
    ///
    /// Must be called from within a Tokio runtime. A previous forwarder
    /// for the same worker is replaced.
    pub fn attach(&self, worker: &AgentId, mut events: broadcast::Receiver<SessionEvent>) {
        let sink = Arc::clone(&self.sink);
        let id = worker.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Delta(text)) => {
                        if let Err(err) = sink.write(&id, &text) {
                            debug!(worker = %id, error = %err, "dropping streamed text");
                        }
                    }
                    Ok(SessionEvent::TurnComplete) => {
                        if let Err(err) = sink.end_turn(&id) {
                            debug!(worker = %id, error = %err, "dropping end of turn");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(worker = %id, skipped, "output stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        if let Some(previous) = self.forwarders().insert(worker.clone(), handle) {
            previous.abort();
        }
    }

    /// Stops forwarding, marks the worker done, and closes its output.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn close(&self, worker: &AgentId) -> ChannelResult<()> {
        if let Some(handle) = self.forwarders().remove(worker) {
            handle.abort();
        }
        self.sink.set_status(worker, ChannelStatus::Done)?;
        self.sink.close(worker)
    }

    /// Closes every worker in `workers`, collecting failures.
    pub fn close_all(&self, workers: &[AgentId]) -> Vec<ChannelError> {
        let errors: Vec<ChannelError> = workers
            .iter()
            .filter_map(|worker| self.close(worker).err())
            .collect();
        for (worker, handle) in self.forwarders().drain() {
            debug!(worker = %worker, "aborting orphaned forwarder");
            handle.abort();
        }
        errors
    }

    fn forwarders(&self) -> MutexGuard<'_, HashMap<AgentId, JoinHandle<()>>> {
        self.forwarders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatusIndicator for OutputRouter {
    fn set_status(&self, worker: &AgentId, status: ChannelStatus) {
        if let Err(err) = self.sink.set_status(worker, status) {
            debug!(worker = %worker, status = %status, error = %err, "status update skipped");
        }
    }

    fn annotate(&self, worker: &AgentId, note: &str) {
        if let Err(err) = self.sink.annotate(worker, note) {
            debug!(worker = %worker, error = %err, "annotation skipped");
        }
    }
}

impl std::fmt::Debug for OutputRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputRouter")
            .field("forwarders", &self.forwarders().len())
            .finish_non_exhaustive()
    }
}
