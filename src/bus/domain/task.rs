//! Task records shared on the task board.

use super::{AgentId, BusError, BusResult, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created and waiting to be claimed.
    Pending,
    /// Claimed by an assignee.
    InProgress,
    /// Finished successfully by the assignee.
    Completed,
    /// Abandoned with a failure reason.
    Failed,
}

impl TaskStatus {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `completed` and `failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned while parsing a task status from tool input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// A unit of work on the shared task board.
///
/// # Invariants
///
/// - `depends_on` only names tasks that existed when this task was created
/// - the status reaches `in_progress` only through [`Task::claim`]
/// - `completed` is reachable only from `in_progress`
/// - terminal statuses are final
/// - `result` is set exactly when the status is terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    description: String,
    status: TaskStatus,
    assignee: Option<AgentId>,
    created_by: AgentId,
    depends_on: Vec<TaskId>,
    result: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending task.
    #[must_use]
    pub fn new(
        id: TaskId,
        description: impl Into<String>,
        created_by: AgentId,
        options: TaskOptions,
        clock: &(impl Clock + ?Sized),
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id,
            description: description.into(),
            status: TaskStatus::Pending,
            assignee: options.assignee,
            created_by,
            depends_on: options.depends_on,
            result: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the task description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<&AgentId> {
        self.assignee.as_ref()
    }

    /// Returns the worker that created the task.
    #[must_use]
    pub const fn created_by(&self) -> &AgentId {
        &self.created_by
    }

    /// Returns the tasks that must complete before this one can be claimed.
    #[must_use]
    pub fn depends_on(&self) -> &[TaskId] {
        &self.depends_on
    }

    /// Returns the completion result or failure reason.
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Assigns the task to `agent` and moves it to `in_progress`.
    ///
    /// Dependency checks need the rest of the board and are performed by
    /// [`crate::bus::board::TaskBoard::claim`] before calling this.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotClaimable`] when the task is not pending or is
    /// preassigned to a different worker.
    pub fn claim(&mut self, agent: &AgentId, clock: &(impl Clock + ?Sized)) -> BusResult<()> {
        let assigned_elsewhere = self.assignee.as_ref().is_some_and(|current| current != agent);
        if self.status != TaskStatus::Pending || assigned_elsewhere {
            return Err(BusError::NotClaimable {
                task_id: self.id.clone(),
                status: self.status,
                assignee: self.assignee.clone(),
            });
        }
        self.assignee = Some(agent.clone());
        self.status = TaskStatus::InProgress;
        self.touch(clock);
        Ok(())
    }

    /// Marks the task completed with a result.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotAssignedToCaller`] when `agent` is not the
    /// current assignee, or [`BusError::InvalidTransition`] when the task
    /// is not in progress.
    pub fn complete(
        &mut self,
        agent: &AgentId,
        result: impl Into<String>,
        clock: &(impl Clock + ?Sized),
    ) -> BusResult<()> {
        self.ensure_assignee(agent)?;
        if self.status != TaskStatus::InProgress {
            return Err(self.invalid_transition(TaskStatus::Completed));
        }
        self.finish(TaskStatus::Completed, result.into(), clock);
        Ok(())
    }

    /// Marks the task failed with a reason.
    ///
    /// A pending task may be failed by any worker. Once claimed, only the
    /// assignee may fail it.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InvalidTransition`] for terminal tasks and
    /// [`BusError::NotAssignedToCaller`] when `agent` is not the assignee
    /// of an in-progress task.
    pub fn fail(
        &mut self,
        agent: &AgentId,
        reason: impl Into<String>,
        clock: &(impl Clock + ?Sized),
    ) -> BusResult<()> {
        if self.status.is_terminal() {
            return Err(self.invalid_transition(TaskStatus::Failed));
        }
        if self.status == TaskStatus::InProgress {
            self.ensure_assignee(agent)?;
        }
        self.finish(TaskStatus::Failed, reason.into(), clock);
        Ok(())
    }

    fn ensure_assignee(&self, agent: &AgentId) -> BusResult<()> {
        if self.assignee.as_ref() == Some(agent) {
            return Ok(());
        }
        Err(BusError::NotAssignedToCaller {
            task_id: self.id.clone(),
            caller: agent.clone(),
            assignee: self.assignee.clone(),
        })
    }

    fn invalid_transition(&self, target: TaskStatus) -> BusError {
        BusError::InvalidTransition {
            task_id: self.id.clone(),
            status: self.status,
            target,
        }
    }

    fn finish(&mut self, status: TaskStatus, result: String, clock: &(impl Clock + ?Sized)) {
        self.status = status;
        self.result = Some(result);
        self.touch(clock);
    }

    fn touch(&mut self, clock: &(impl Clock + ?Sized)) {
        self.updated_at = clock.utc();
    }
}

/// Optional fields accepted when creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Worker the task is reserved for.
    pub assignee: Option<AgentId>,
    /// Tasks that must complete first.
    pub depends_on: Vec<TaskId>,
}

impl TaskOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the task for `assignee`.
    #[must_use]
    pub fn with_assignee(mut self, assignee: AgentId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Sets the task dependencies.
    #[must_use]
    pub fn with_depends_on(mut self, depends_on: impl IntoIterator<Item = TaskId>) -> Self {
        self.depends_on = depends_on.into_iter().collect();
        self
    }
}

/// Snapshot filter for [`crate::bus::MessageBus::list_tasks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Keep only tasks in this status.
    pub status: Option<TaskStatus>,
    /// Keep only tasks assigned to this worker.
    pub assignee: Option<AgentId>,
}

impl TaskFilter {
    /// Creates a filter that matches every task.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the filter to one status.
    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts the filter to one assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee: AgentId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Returns `true` when `task` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        let status_ok = self.status.is_none_or(|status| task.status() == status);
        let assignee_ok = self
            .assignee
            .as_ref()
            .is_none_or(|assignee| task.assignee() == Some(assignee));
        status_ok && assignee_ok
    }
}
