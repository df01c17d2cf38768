//! Worker table shared by the gate, the tools, and the coordinator.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{backend::BackendSession, bus::domain::AgentId};

use super::worker::{ManagedWorker, WorkerSnapshot};

#[derive(Debug, Default)]
struct WorkerTable {
    workers: HashMap<AgentId, ManagedWorker>,
    order: Vec<AgentId>,
}

/// Owner of every [`ManagedWorker`].
///
/// Completion handlers look workers up again after each suspension point,
/// so a worker removed mid-turn is simply skipped.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    state: RwLock<WorkerTable>,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a worker. Returns `false` and leaves the table unchanged when
    /// the id is already present.
    pub fn insert(&self, worker: ManagedWorker) -> bool {
        let mut table = self.write();
        let id = worker.id().clone();
        if table.workers.contains_key(&id) {
            return false;
        }
        table.order.push(id.clone());
        table.workers.insert(id, worker);
        true
    }

    /// Removes and returns a worker.
    pub fn remove(&self, id: &AgentId) -> Option<ManagedWorker> {
        let mut table = self.write();
        let removed = table.workers.remove(id)?;
        table.order.retain(|known| known != id);
        Some(removed)
    }

    /// Removes every worker, returning them in insertion order.
    pub fn drain(&self) -> Vec<ManagedWorker> {
        let mut table = self.write();
        let order = std::mem::take(&mut table.order);
        order
            .iter()
            .filter_map(|id| table.workers.remove(id))
            .collect()
    }

    /// Returns `true` when `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &AgentId) -> bool {
        self.read().workers.contains_key(id)
    }

    /// Returns the number of workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    /// Returns `true` when no worker is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns worker ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<AgentId> {
        self.read().order.clone()
    }

    /// Returns the backend session of `id`.
    #[must_use]
    pub fn session(&self, id: &AgentId) -> Option<Arc<dyn BackendSession>> {
        self.read().workers.get(id).map(ManagedWorker::session)
    }

    /// Returns a snapshot of `id`.
    #[must_use]
    pub fn snapshot(&self, id: &AgentId) -> Option<WorkerSnapshot> {
        self.read().workers.get(id).map(ManagedWorker::snapshot)
    }

    /// Returns snapshots of every worker in insertion order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<WorkerSnapshot> {
        let table = self.read();
        table
            .order
            .iter()
            .filter_map(|id| table.workers.get(id))
            .map(ManagedWorker::snapshot)
            .collect()
    }

    /// Returns `true` when no worker is busy or has queued prompts.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.read()
            .workers
            .values()
            .all(|worker| !worker.is_busy() && worker.queued() == 0)
    }

    /// Runs `f` against the worker under the write lock.
    ///
    /// Returns `None` when the worker no longer exists.
    pub(crate) fn with_worker<R>(
        &self,
        id: &AgentId,
        f: impl FnOnce(&mut ManagedWorker) -> R,
    ) -> Option<R> {
        self.write().workers.get_mut(id).map(f)
    }

    fn read(&self) -> RwLockReadGuard<'_, WorkerTable> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, WorkerTable> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
