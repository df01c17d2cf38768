//! Identifier types for workers, messages, tasks, and event subscriptions.

use super::BusError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Mailbox address that fans a message out to every other registered worker.
pub const BROADCAST_ADDRESS: &str = "*";

/// Identifier of a registered worker.
///
/// Worker identifiers double as mailbox addresses, so the broadcast
/// address and whitespace are rejected at construction.
///
/// # Examples
///
/// ```
/// use ensemble::bus::domain::AgentId;
///
/// let id = AgentId::new("alice").expect("valid id");
/// assert_eq!(id.as_str(), "alice");
/// assert!(AgentId::new("*").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Creates a validated worker identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InvalidAgentId`] when the trimmed value is empty,
    /// contains whitespace, or equals the broadcast address.
    pub fn new(value: impl Into<String>) -> Result<Self, BusError> {
        let raw = value.into();
        let normalized = raw.trim();
        let is_valid = !normalized.is_empty()
            && normalized != BROADCAST_ADDRESS
            && !normalized.chars().any(char::is_whitespace);
        if !is_valid {
            return Err(BusError::InvalidAgentId(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AgentId {
    type Error = BusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for AgentId {
    type Error = BusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AgentId> for String {
    fn from(value: AgentId) -> Self {
        value.0
    }
}

/// Addressee of a send: one worker or every other worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// A single registered worker.
    Agent(AgentId),
    /// Every registered worker except the sender.
    Broadcast,
}

impl Recipient {
    /// Parses a raw address, mapping `"*"` to [`Recipient::Broadcast`].
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InvalidAgentId`] when the address is neither the
    /// broadcast address nor a valid worker identifier.
    pub fn parse(value: &str) -> Result<Self, BusError> {
        if value.trim() == BROADCAST_ADDRESS {
            return Ok(Self::Broadcast);
        }
        AgentId::new(value).map(Self::Agent)
    }
}

impl From<AgentId> for Recipient {
    fn from(value: AgentId) -> Self {
        Self::Agent(value)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent(id) => id.fmt(f),
            Self::Broadcast => f.write_str(BROADCAST_ADDRESS),
        }
    }
}

/// Bus-assigned message identifier, rendered as `msg-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Creates a message identifier from its bus sequence number.
    #[must_use]
    pub const fn from_sequence(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Returns the bus sequence number.
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Task board identifier, rendered as `task-<n>` for bus-created tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a raw task identifier, typically one supplied by a tool call.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_owned())
    }

    /// Creates the identifier the board assigns to its `sequence`-th task.
    #[must_use]
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("task-{sequence}"))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle returned by [`crate::bus::events::EventHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Creates a new random subscription handle.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
