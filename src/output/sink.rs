//! Output sink strategies.

use std::{
    collections::HashMap,
    io::Write,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{
    domain::{ChannelId, ChannelStatus, channel_title},
    ports::{ChannelError, ChannelHost, ChannelResult},
};
use crate::{bus::domain::AgentId, dispatch::WorkerProfile};

/// Destination for worker output.
pub trait OutputSink: Send + Sync {
    /// Prepares output for a newly spawned worker.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the destination cannot be created.
    fn open(&self, profile: &WorkerProfile) -> ChannelResult<()>;

    /// Forwards a streamed text fragment.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the destination rejects the write.
    fn write(&self, worker: &AgentId, text: &str) -> ChannelResult<()>;

    /// Marks the end of a backend turn.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the destination rejects the write.
    fn end_turn(&self, worker: &AgentId) -> ChannelResult<()>;

    /// Shows a status indicator for the worker.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the destination rejects the update.
    fn set_status(&self, worker: &AgentId, status: ChannelStatus) -> ChannelResult<()>;

    /// Releases the worker's destination.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the destination fails to close.
    fn close(&self, worker: &AgentId) -> ChannelResult<()>;

    /// Writes `note` on a line of its own.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the destination rejects the write.
    fn annotate(&self, worker: &AgentId, note: &str) -> ChannelResult<()> {
        self.end_turn(worker)?;
        self.write(worker, &format!("{note}\n"))
    }
}

#[derive(Debug)]
struct ChannelEntry {
    id: ChannelId,
    name: String,
    model: String,
    at_line_start: bool,
}

/// One dedicated channel per worker, written verbatim.
pub struct ChannelSink {
    host: Arc<dyn ChannelHost>,
    channels: Mutex<HashMap<AgentId, ChannelEntry>>,
}

impl ChannelSink {
    /// Creates a sink over `host`.
    #[must_use]
    pub fn new(host: Arc<dyn ChannelHost>) -> Self {
        Self {
            host,
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<AgentId, ChannelEntry>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn channel_of(&self, worker: &AgentId) -> ChannelResult<ChannelId> {
        self.channels()
            .get(worker)
            .map(|entry| entry.id.clone())
            .ok_or_else(|| ChannelError::NotFound(ChannelId::for_worker(worker)))
    }
}

impl OutputSink for ChannelSink {
    fn open(&self, profile: &WorkerProfile) -> ChannelResult<()> {
        let title = channel_title(
            ChannelStatus::Thinking,
            &profile.name,
            &profile.backend.model,
        );
        let id = self.host.create(&profile.id, &title)?;
        self.channels().insert(
            profile.id.clone(),
            ChannelEntry {
                id,
                name: profile.name.clone(),
                model: profile.backend.model.clone(),
                at_line_start: true,
            },
        );
        Ok(())
    }

    fn write(&self, worker: &AgentId, text: &str) -> ChannelResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        let id = self.channel_of(worker)?;
        self.host.write(&id, text)?;
        if let Some(entry) = self.channels().get_mut(worker) {
            entry.at_line_start = text.ends_with('\n');
        }
        Ok(())
    }

    fn end_turn(&self, worker: &AgentId) -> ChannelResult<()> {
        let at_line_start = self
            .channels()
            .get(worker)
            .map(|entry| entry.at_line_start)
            .ok_or_else(|| ChannelError::NotFound(ChannelId::for_worker(worker)))?;
        if at_line_start {
            return Ok(());
        }
        self.write(worker, "\n")
    }

    fn set_status(&self, worker: &AgentId, status: ChannelStatus) -> ChannelResult<()> {
        let (id, title) = {
            let channels = self.channels();
            let entry = channels
                .get(worker)
                .ok_or_else(|| ChannelError::NotFound(ChannelId::for_worker(worker)))?;
            (
                entry.id.clone(),
                channel_title(status, &entry.name, &entry.model),
            )
        };
        self.host.set_title(&id, &title)
    }

    fn close(&self, worker: &AgentId) -> ChannelResult<()> {
        let entry = self
            .channels()
            .remove(worker)
            .ok_or_else(|| ChannelError::NotFound(ChannelId::for_worker(worker)))?;
        self.host.close(&entry.id)
    }
}

#[derive(Debug)]
struct SharedState<W> {
    writer: W,
    workers: HashMap<AgentId, SharedEntry>,
}

#[derive(Debug)]
struct SharedEntry {
    prefix: String,
    at_line_start: bool,
}

/// Single stream shared by every worker.
///
/// Each output line starts with `[<name>] `, emitted once per line even
/// when text arrives in small fragments.
pub struct SharedStreamSink<W> {
    state: Mutex<SharedState<W>>,
}

impl<W: Write + Send> SharedStreamSink<W> {
    /// Creates a sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            state: Mutex::new(SharedState {
                writer,
                workers: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SharedState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W> SharedState<W>
where
    W: Write,
{
    fn write_prefixed(&mut self, worker: &AgentId, text: &str) -> ChannelResult<()> {
        let entry = self
            .workers
            .get_mut(worker)
            .ok_or_else(|| ChannelError::NotFound(ChannelId::for_worker(worker)))?;
        for segment in text.split_inclusive('\n') {
            if entry.at_line_start {
                self.writer.write_all(entry.prefix.as_bytes())?;
            }
            self.writer.write_all(segment.as_bytes())?;
            entry.at_line_start = segment.ends_with('\n');
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> OutputSink for SharedStreamSink<W> {
    fn open(&self, profile: &WorkerProfile) -> ChannelResult<()> {
        self.state().workers.insert(
            profile.id.clone(),
            SharedEntry {
                prefix: format!("[{}] ", profile.name),
                at_line_start: true,
            },
        );
        Ok(())
    }

    fn write(&self, worker: &AgentId, text: &str) -> ChannelResult<()> {
        self.state().write_prefixed(worker, text)
    }

    fn end_turn(&self, worker: &AgentId) -> ChannelResult<()> {
        let mut state = self.state();
        let at_line_start = state
            .workers
            .get(worker)
            .ok_or_else(|| ChannelError::NotFound(ChannelId::for_worker(worker)))?
            .at_line_start;
        if at_line_start {
            return Ok(());
        }
        state.write_prefixed(worker, "\n")
    }

    fn set_status(&self, worker: &AgentId, _status: ChannelStatus) -> ChannelResult<()> {
        if self.state().workers.contains_key(worker) {
            return Ok(());
        }
        Err(ChannelError::NotFound(ChannelId::for_worker(worker)))
    }

    fn close(&self, worker: &AgentId) -> ChannelResult<()> {
        self.end_turn(worker)?;
        self.state().workers.remove(worker);
        Ok(())
    }
}
