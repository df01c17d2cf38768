//! In-memory channel host for tests and embedding.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    bus::domain::AgentId,
    output::{
        domain::ChannelId,
        ports::{ChannelError, ChannelHost, ChannelResult},
    },
};

#[derive(Debug, Default)]
struct ChannelRecord {
    output: String,
    titles: Vec<String>,
    closed: bool,
}

/// Channel host that keeps every channel's text and title history.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChannelHost {
    channels: Arc<RwLock<HashMap<ChannelId, ChannelRecord>>>,
}

impl InMemoryChannelHost {
    /// Creates a host with no channels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything written to `channel`.
    #[must_use]
    pub fn output(&self, channel: &ChannelId) -> Option<String> {
        self.read().get(channel).map(|record| record.output.clone())
    }

    /// Returns the current title of `channel`.
    #[must_use]
    pub fn title(&self, channel: &ChannelId) -> Option<String> {
        self.read()
            .get(channel)
            .and_then(|record| record.titles.last().cloned())
    }

    /// Returns every title `channel` has had, oldest first.
    #[must_use]
    pub fn titles(&self, channel: &ChannelId) -> Vec<String> {
        self.read()
            .get(channel)
            .map(|record| record.titles.clone())
            .unwrap_or_default()
    }

    /// Returns `true` once `channel` was closed.
    #[must_use]
    pub fn is_closed(&self, channel: &ChannelId) -> bool {
        self.read().get(channel).is_some_and(|record| record.closed)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ChannelId, ChannelRecord>> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, HashMap<ChannelId, ChannelRecord>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_open<R>(
        &self,
        channel: &ChannelId,
        f: impl FnOnce(&mut ChannelRecord) -> R,
    ) -> ChannelResult<R> {
        let mut channels = self.write_lock();
        let record = channels
            .get_mut(channel)
            .ok_or_else(|| ChannelError::NotFound(channel.clone()))?;
        if record.closed {
            return Err(ChannelError::Closed(channel.clone()));
        }
        Ok(f(record))
    }
}

impl ChannelHost for InMemoryChannelHost {
    fn create(&self, worker: &AgentId, title: &str) -> ChannelResult<ChannelId> {
        let id = ChannelId::for_worker(worker);
        let record = ChannelRecord {
            titles: vec![title.to_owned()],
            ..ChannelRecord::default()
        };
        self.write_lock().insert(id.clone(), record);
        Ok(id)
    }

    fn write(&self, channel: &ChannelId, text: &str) -> ChannelResult<()> {
        self.with_open(channel, |record| record.output.push_str(text))
    }

    fn set_title(&self, channel: &ChannelId, title: &str) -> ChannelResult<()> {
        self.with_open(channel, |record| record.titles.push(title.to_owned()))
    }

    fn close(&self, channel: &ChannelId) -> ChannelResult<()> {
        self.with_open(channel, |record| record.closed = true)
    }
}
