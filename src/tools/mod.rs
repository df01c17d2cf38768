//! Callable operations injected into every backend session.
//!
//! Each [`WorkerTools`] value is bound to one worker identity, so the
//! sender of a message or the claimant of a task is never supplied by the
//! backend. Backends that speak JSON call [`WorkerTools::invoke`] and get
//! a structured [`ToolOutcome`] back, failures included.

mod definitions;
mod error;
mod invoke;

pub use definitions::{ToolDefinition, ToolName};
pub use error::{ToolError, ToolResult};
pub use invoke::{ToolCall, ToolFailure, ToolOutcome};

use std::sync::Arc;

use crate::{
    bus::{
        MessageBus,
        domain::{AgentId, AgentMessage, Recipient, Task, TaskFilter, TaskId, TaskOptions, TaskStatus},
    },
    dispatch::{WorkerRegistry, WorkerSnapshot},
};

/// Tool surface for one worker.
#[derive(Clone)]
pub struct WorkerTools {
    agent: AgentId,
    bus: Arc<MessageBus>,
    workers: Arc<WorkerRegistry>,
}

impl WorkerTools {
    /// Binds the tools to `agent`.
    #[must_use]
    pub const fn new(agent: AgentId, bus: Arc<MessageBus>, workers: Arc<WorkerRegistry>) -> Self {
        Self {
            agent,
            bus,
            workers,
        }
    }

    /// Returns the worker these tools act for.
    #[must_use]
    pub const fn agent(&self) -> &AgentId {
        &self.agent
    }

    /// Sends `content` to `to`, which may also be the broadcast address.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Bus`] for malformed or unknown recipients.
    pub fn send_message(&self, to: &str, content: &str) -> ToolResult<Vec<AgentMessage>> {
        let recipient = Recipient::parse(to)?;
        Ok(self.bus.send_message(&self.agent, &recipient, content)?)
    }

    /// Sends `content` to every other registered worker.
    ///
    /// # Errors
    ///
    /// Propagates bus delivery failures.
    pub fn broadcast(&self, content: &str) -> ToolResult<Vec<AgentMessage>> {
        Ok(self
            .bus
            .send_message(&self.agent, &Recipient::Broadcast, content)?)
    }

    /// Reads and marks read every unread message for this worker.
    #[must_use]
    pub fn read_messages(&self) -> Vec<AgentMessage> {
        self.bus.read_messages(&self.agent, true)
    }

    /// Creates a task owned by this worker.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Bus`] for invalid assignees or unknown
    /// dependencies.
    pub fn create_task(
        &self,
        description: &str,
        assignee: Option<&str>,
        depends_on: &[String],
    ) -> ToolResult<Task> {
        let mut options =
            TaskOptions::new().with_depends_on(depends_on.iter().map(|id| TaskId::new(id.as_str())));
        if let Some(raw) = assignee {
            options = options.with_assignee(AgentId::new(raw)?);
        }
        Ok(self.bus.create_task(description, &self.agent, options)?)
    }

    /// Claims a pending task for this worker.
    ///
    /// # Errors
    ///
    /// Returns the bus claim failure unchanged.
    pub fn claim_task(&self, id: &str) -> ToolResult<Task> {
        Ok(self.bus.claim_task(&TaskId::new(id), &self.agent)?)
    }

    /// Completes a task assigned to this worker.
    ///
    /// # Errors
    ///
    /// Returns the bus completion failure unchanged.
    pub fn complete_task(&self, id: &str, result: &str) -> ToolResult<Task> {
        Ok(self
            .bus
            .complete_task(&TaskId::new(id), &self.agent, result)?)
    }

    /// Marks a task failed.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Bus`] when the task does not exist.
    pub fn fail_task(&self, id: &str, reason: &str) -> ToolResult<Task> {
        Ok(self.bus.fail_task(&TaskId::new(id), &self.agent, reason)?)
    }

    /// Lists tasks, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidStatus`] for unknown status labels.
    pub fn list_tasks(&self, status: Option<&str>) -> ToolResult<Vec<Task>> {
        let mut filter = TaskFilter::all();
        if let Some(raw) = status {
            filter = filter.with_status(TaskStatus::try_from(raw)?);
        }
        Ok(self.bus.list_tasks(&filter))
    }

    /// Lists every worker in the team.
    #[must_use]
    pub fn list_workers(&self) -> Vec<WorkerSnapshot> {
        self.workers.snapshots()
    }
}

impl std::fmt::Debug for WorkerTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerTools")
            .field("agent", &self.agent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
