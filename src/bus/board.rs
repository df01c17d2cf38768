//! Shared, dependency-aware task records.

use std::collections::HashMap;

use mockable::Clock;

use crate::bus::domain::{
    AgentId, BusError, BusResult, Task, TaskFilter, TaskId, TaskOptions, TaskStatus,
};

/// Task store with dependency-checked claiming.
///
/// Tasks are listed in creation order. Identifiers are `task-1`,
/// `task-2`, ... and restart from one after [`TaskBoard::clear`].
#[derive(Debug, Default)]
pub struct TaskBoard {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
    last_sequence: u64,
}

impl TaskBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pending task.
    ///
    /// Duplicate dependency ids are collapsed, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownDependency`] when a dependency does not
    /// name an existing task.
    pub fn create(
        &mut self,
        description: impl Into<String>,
        created_by: AgentId,
        options: TaskOptions,
        clock: &(impl Clock + ?Sized),
    ) -> BusResult<Task> {
        let mut depends_on: Vec<TaskId> = Vec::with_capacity(options.depends_on.len());
        for dependency in options.depends_on {
            if !self.tasks.contains_key(&dependency) {
                return Err(BusError::UnknownDependency { dependency });
            }
            if !depends_on.contains(&dependency) {
                depends_on.push(dependency);
            }
        }

        self.last_sequence += 1;
        let id = TaskId::from_sequence(self.last_sequence);
        let options = TaskOptions {
            assignee: options.assignee,
            depends_on,
        };
        let task = Task::new(id.clone(), description, created_by, options, clock);
        self.tasks.insert(id.clone(), task.clone());
        self.order.push(id);
        Ok(task)
    }

    /// Claims a pending task for `agent`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::TaskNotFound`], [`BusError::NotClaimable`] when
    /// the task is not pending or is reserved for another worker, or
    /// [`BusError::DependencyBlocked`] while any dependency is unfinished.
    pub fn claim(
        &mut self,
        id: &TaskId,
        agent: &AgentId,
        clock: &(impl Clock + ?Sized),
    ) -> BusResult<Task> {
        let task = self
            .tasks
            .get(id)
            .ok_or_else(|| BusError::TaskNotFound(id.clone()))?;
        if task.status() != TaskStatus::Pending {
            return Err(BusError::NotClaimable {
                task_id: id.clone(),
                status: task.status(),
                assignee: task.assignee().cloned(),
            });
        }

        let blocking = self.blocking_dependencies(task);
        if !blocking.is_empty() {
            return Err(BusError::DependencyBlocked {
                task_id: id.clone(),
                blocking,
            });
        }

        let task = self.task_mut(id)?;
        task.claim(agent, clock)?;
        Ok(task.clone())
    }

    /// Completes a task on behalf of its assignee.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::TaskNotFound`],
    /// [`BusError::NotAssignedToCaller`], or [`BusError::InvalidTransition`]
    /// when the task was never claimed or already finished.
    pub fn complete(
        &mut self,
        id: &TaskId,
        agent: &AgentId,
        result: impl Into<String>,
        clock: &(impl Clock + ?Sized),
    ) -> BusResult<Task> {
        let task = self.task_mut(id)?;
        task.complete(agent, result, clock)?;
        Ok(task.clone())
    }

    /// Fails a task with a reason.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::TaskNotFound`], [`BusError::InvalidTransition`]
    /// for finished tasks, or [`BusError::NotAssignedToCaller`] when
    /// `agent` does not hold the in-progress task.
    pub fn fail(
        &mut self,
        id: &TaskId,
        agent: &AgentId,
        reason: impl Into<String>,
        clock: &(impl Clock + ?Sized),
    ) -> BusResult<Task> {
        let task = self.task_mut(id)?;
        task.fail(agent, reason, clock)?;
        Ok(task.clone())
    }

    /// Returns a copy of the task with `id`.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.get(id).cloned()
    }

    /// Returns matching tasks in creation order.
    #[must_use]
    pub fn list(&self, filter: &TaskFilter) -> Vec<Task> {
        self.order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    /// Returns `true` when any task is in progress.
    #[must_use]
    pub fn has_in_progress(&self) -> bool {
        self.tasks
            .values()
            .any(|task| task.status() == TaskStatus::InProgress)
    }

    /// Removes every task and restarts the id sequence.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.order.clear();
        self.last_sequence = 0;
    }

    fn blocking_dependencies(&self, task: &Task) -> Vec<TaskId> {
        task.depends_on()
            .iter()
            .filter(|dependency| {
                self.tasks
                    .get(*dependency)
                    .is_none_or(|found| found.status() != TaskStatus::Completed)
            })
            .cloned()
            .collect()
    }

    fn task_mut(&mut self, id: &TaskId) -> BusResult<&mut Task> {
        self.tasks
            .get_mut(id)
            .ok_or_else(|| BusError::TaskNotFound(id.clone()))
    }
}
