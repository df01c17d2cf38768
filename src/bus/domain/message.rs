//! Addressed messages stored in worker mailboxes.

use super::{AgentId, MessageId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A message delivered to one worker's mailbox.
///
/// Broadcasts are stored as one copy per recipient, so `to` is always a
/// concrete worker. Everything except the `read` flag is immutable once the
/// message has been appended to a mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    id: MessageId,
    from: AgentId,
    to: AgentId,
    content: String,
    broadcast: bool,
    timestamp: DateTime<Utc>,
    read: bool,
}

impl AgentMessage {
    /// Creates an unread message stamped with the current clock time.
    #[must_use]
    pub fn new(
        id: MessageId,
        from: AgentId,
        to: AgentId,
        content: impl Into<String>,
        clock: &(impl Clock + ?Sized),
    ) -> Self {
        Self {
            id,
            from,
            to,
            content: content.into(),
            broadcast: false,
            timestamp: clock.utc(),
            read: false,
        }
    }

    /// Marks the message as one copy of a broadcast.
    #[must_use]
    pub fn as_broadcast(mut self) -> Self {
        self.broadcast = true;
        self
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the sending worker.
    #[must_use]
    pub const fn sender(&self) -> &AgentId {
        &self.from
    }

    /// Returns the receiving worker.
    #[must_use]
    pub const fn recipient(&self) -> &AgentId {
        &self.to
    }

    /// Returns the message body.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns `true` when the message was sent to the broadcast address.
    #[must_use]
    pub const fn is_broadcast(&self) -> bool {
        self.broadcast
    }

    /// Returns the time the bus accepted the message.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns `true` once the recipient has read the message.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read
    }

    pub(crate) const fn mark_read(&mut self) {
        self.read = true;
    }
}
