//! Lifecycle notifications published by the message bus.

use super::{AgentMessage, Task};
use serde::{Deserialize, Serialize};

/// Event emitted after a bus mutation has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// One send (direct or broadcast) was accepted.
    Message {
        /// Every mailbox copy created by the send.
        messages: Vec<AgentMessage>,
    },
    /// A task was added to the board.
    TaskCreated {
        /// The new task.
        task: Task,
    },
    /// A task was claimed or failed.
    TaskUpdated {
        /// The task after the change.
        task: Task,
    },
    /// A task was completed by its assignee.
    TaskCompleted {
        /// The task after the change.
        task: Task,
    },
}

impl BusEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::TaskCreated { .. } => "task:created",
            Self::TaskUpdated { .. } => "task:updated",
            Self::TaskCompleted { .. } => "task:completed",
        }
    }
}
