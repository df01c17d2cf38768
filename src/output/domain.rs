//! Channel identifiers and status indicators.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bus::domain::AgentId;

/// Handle of a dedicated output channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Wraps a host-assigned channel name.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derives the channel name hosts use for `worker`.
    #[must_use]
    pub fn for_worker(worker: &AgentId) -> Self {
        Self(worker.as_str().to_owned())
    }

    /// Returns the channel name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Activity indicator shown in a channel title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// The worker's session is starting.
    Thinking,
    /// A backend turn is in flight.
    Working,
    /// Waiting for the next prompt.
    Idle,
    /// The worker was shut down.
    Done,
}

impl ChannelStatus {
    /// Returns the single-character glyph for titles.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Thinking => '◐',
            Self::Working => '●',
            Self::Idle => '○',
            Self::Done => '✓',
        }
    }

    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Thinking => "thinking",
            Self::Working => "working",
            Self::Idle => "idle",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats a channel title as `<glyph> <name> [<model>]`.
#[must_use]
pub fn channel_title(status: ChannelStatus, name: &str, model: &str) -> String {
    format!("{} {name} [{model}]", status.glyph())
}
