//! Managed worker state and its read-only snapshot.

use std::{collections::VecDeque, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    backend::{BackendConfig, BackendSession},
    bus::domain::AgentId,
};

/// Identifier reserved for the lead worker.
pub const LEAD_ID: &str = "lead";

/// Position of a worker within the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    /// Receives submitted work and delegates it.
    Lead,
    /// Spawned helper with an optional specialty.
    Teammate,
}

impl WorkerRole {
    /// Returns the canonical lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Teammate => "teammate",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerProfile {
    /// Worker identifier, also its mailbox address.
    pub id: AgentId,
    /// Display name used in output prefixes and channel titles.
    pub name: String,
    /// Team role.
    pub role: WorkerRole,
    /// Area of expertise, if any.
    pub specialty: Option<String>,
    /// Backend selection.
    pub backend: BackendConfig,
}

impl WorkerProfile {
    /// Describes the lead worker.
    #[must_use]
    pub fn lead(id: AgentId, backend: BackendConfig) -> Self {
        Self {
            id,
            name: "Lead".to_owned(),
            role: WorkerRole::Lead,
            specialty: None,
            backend,
        }
    }

    /// Describes a teammate.
    #[must_use]
    pub fn teammate(
        id: AgentId,
        name: impl Into<String>,
        specialty: Option<String>,
        backend: BackendConfig,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role: WorkerRole::Teammate,
            specialty,
            backend,
        }
    }
}

/// A live worker: profile, backend session, and dispatch bookkeeping.
///
/// The busy flag and turn counter are only changed by the dispatch gate.
pub struct ManagedWorker {
    profile: WorkerProfile,
    session: Arc<dyn BackendSession>,
    busy: bool,
    turn_count: u32,
    queue: VecDeque<String>,
    last_error: Option<String>,
}

impl ManagedWorker {
    /// Wraps a freshly created session.
    #[must_use]
    pub fn new(profile: WorkerProfile, session: Arc<dyn BackendSession>) -> Self {
        Self {
            profile,
            session,
            busy: false,
            turn_count: 0,
            queue: VecDeque::new(),
            last_error: None,
        }
    }

    /// Returns the worker identifier.
    #[must_use]
    pub const fn id(&self) -> &AgentId {
        &self.profile.id
    }

    /// Returns the static profile.
    #[must_use]
    pub const fn profile(&self) -> &WorkerProfile {
        &self.profile
    }

    /// Returns a handle to the backend session.
    #[must_use]
    pub fn session(&self) -> Arc<dyn BackendSession> {
        Arc::clone(&self.session)
    }

    /// Returns `true` while a backend turn is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    /// Returns the number of turns charged so far.
    #[must_use]
    pub const fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Prompts waiting in the engine queue or inside the backend.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len() + self.session.pending()
    }

    /// Returns the most recent backend failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Captures the current state for callers outside the gate.
    #[must_use]
    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.profile.id.clone(),
            name: self.profile.name.clone(),
            role: self.profile.role,
            specialty: self.profile.specialty.clone(),
            backend: self.profile.backend.model.clone(),
            busy: self.busy,
            turn_count: self.turn_count,
            queued: self.queued(),
            last_error: self.last_error.clone(),
        }
    }

    pub(crate) const fn begin_turn(&mut self) -> u32 {
        self.busy = true;
        self.turn_count = self.turn_count.saturating_add(1);
        self.turn_count
    }

    /// Charges a turn for a prompt the backend runs from its own queue.
    pub(crate) const fn reserve_turn(&mut self) {
        self.turn_count = self.turn_count.saturating_add(1);
    }

    pub(crate) const fn settle(&mut self) {
        self.busy = false;
    }

    pub(crate) fn push_queued(&mut self, prompt: String, capacity: usize) -> bool {
        if self.queue.len() >= capacity {
            return false;
        }
        self.queue.push_back(prompt);
        true
    }

    pub(crate) fn pop_queued(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    pub(crate) fn clear_queue(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    pub(crate) fn record_error(&mut self, message: String) {
        self.last_error = Some(message);
    }
}

impl fmt::Debug for ManagedWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedWorker")
            .field("profile", &self.profile)
            .field("busy", &self.busy)
            .field("turn_count", &self.turn_count)
            .field("queued", &self.queue.len())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// Worker identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Team role.
    pub role: WorkerRole,
    /// Area of expertise, if any.
    pub specialty: Option<String>,
    /// Backend model identifier.
    pub backend: String,
    /// Whether a backend turn is in flight.
    pub busy: bool,
    /// Turns charged so far.
    pub turn_count: u32,
    /// Prompts waiting behind the current turn.
    pub queued: usize,
    /// Most recent backend failure.
    pub last_error: Option<String>,
}
