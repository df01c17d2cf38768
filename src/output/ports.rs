//! Ports for channel hosting and status reporting.

use std::sync::Arc;

use thiserror::Error;

use super::domain::{ChannelId, ChannelStatus};
use crate::bus::domain::AgentId;

/// Result type for channel host operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Environment able to give each worker its own output destination.
pub trait ChannelHost: Send + Sync {
    /// Opens a channel for `worker` with an initial title.
    fn create(&self, worker: &AgentId, title: &str) -> ChannelResult<ChannelId>;

    /// Appends `text` verbatim.
    fn write(&self, channel: &ChannelId, text: &str) -> ChannelResult<()>;

    /// Replaces the channel title.
    fn set_title(&self, channel: &ChannelId, title: &str) -> ChannelResult<()>;

    /// Closes the channel. Later writes fail with [`ChannelError::Closed`].
    fn close(&self, channel: &ChannelId) -> ChannelResult<()>;
}

/// Receives status changes from the dispatch gate.
pub trait StatusIndicator: Send + Sync {
    /// Shows `status` for `worker`.
    fn set_status(&self, worker: &AgentId, status: ChannelStatus);

    /// Writes a short diagnostic line to the worker's output.
    fn annotate(&self, worker: &AgentId, note: &str);
}

/// Errors returned by channel hosts.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// No channel with this id exists.
    #[error("channel {0} not found")]
    NotFound(ChannelId),

    /// The channel was closed.
    #[error("channel {0} is closed")]
    Closed(ChannelId),

    /// The host could not reach its backing store.
    #[error("channel host I/O error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for ChannelError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
