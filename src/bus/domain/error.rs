//! Error types for message bus and task board operations.

use super::{AgentId, TaskId, TaskStatus};
use thiserror::Error;

/// Errors surfaced synchronously by [`crate::bus::MessageBus`] operations.
///
/// Registration errors and task-state errors are never retried by the bus;
/// they propagate to whichever caller (usually a worker tool call) issued
/// the mutating operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    /// The value is not a usable worker identifier.
    #[error("invalid agent id '{0}': must be non-empty, without whitespace, and not '*'")]
    InvalidAgentId(String),

    /// The addressed worker has no registered mailbox.
    #[error("unknown recipient: {0}")]
    UnknownRecipient(AgentId),

    /// No task exists with the given identifier.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// A `dependsOn` entry references a task that does not exist.
    #[error("unknown dependency: {dependency}")]
    UnknownDependency {
        /// The missing dependency identifier.
        dependency: TaskId,
    },

    /// The task cannot be claimed in its current state.
    #[error("task {task_id} is not claimable (status {status}{})", format_assignee(.assignee.as_ref()))]
    NotClaimable {
        /// Task that was targeted.
        task_id: TaskId,
        /// Status at the time of the claim.
        status: TaskStatus,
        /// Current assignee, if any.
        assignee: Option<AgentId>,
    },

    /// At least one dependency has not completed.
    #[error("task {task_id} is blocked by unfinished dependencies: {}", format_ids(.blocking))]
    DependencyBlocked {
        /// Task that was targeted.
        task_id: TaskId,
        /// Dependencies whose status is not `completed`.
        blocking: Vec<TaskId>,
    },

    /// The task cannot finish from its current status.
    #[error("task {task_id} cannot move from {status} to {target}")]
    InvalidTransition {
        /// Task that was targeted.
        task_id: TaskId,
        /// Status at the time of the call.
        status: TaskStatus,
        /// Status the caller asked for.
        target: TaskStatus,
    },

    /// Only the current assignee may finish the task.
    #[error("task {task_id} is not assigned to {caller}{}", format_assignee(.assignee.as_ref()))]
    NotAssignedToCaller {
        /// Task that was targeted.
        task_id: TaskId,
        /// Worker that attempted the operation.
        caller: AgentId,
        /// Current assignee, if any.
        assignee: Option<AgentId>,
    },
}

impl BusError {
    /// Returns a stable snake-case label for structured tool failures.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAgentId(_) => "invalid_agent_id",
            Self::UnknownRecipient(_) => "unknown_recipient",
            Self::TaskNotFound(_) => "task_not_found",
            Self::UnknownDependency { .. } => "unknown_dependency",
            Self::NotClaimable { .. } => "not_claimable",
            Self::DependencyBlocked { .. } => "dependency_blocked",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotAssignedToCaller { .. } => "not_assigned_to_caller",
        }
    }
}

fn format_assignee(assignee: Option<&AgentId>) -> String {
    assignee.map_or_else(String::new, |id| format!(", assigned to {id}"))
}

fn format_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for message bus operations.
pub type BusResult<T> = Result<T, BusError>;
