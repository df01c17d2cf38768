//! Unit tests for the dispatch gate and worker registry.


use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    backend::{
        BackendConfig, BackendFactory, BackendSession, SessionRequest,
        adapters::{ScriptedBackend, ScriptedSession},
    },
    bus::{MessageBus, domain::AgentId},
    config::DispatchConfig,
    dispatch::{DispatchGate, ManagedWorker, WorkerProfile, WorkerRegistry},
    output::{ChannelStatus, StatusIndicator},
    tools::WorkerTools,
};
use rstest::fixture;

pub(super) fn agent(id: &str) -> AgentId {
    AgentId::new(id).expect("valid agent id")
}

/// Status indicator that records every update.
#[derive(Debug, Default)]
pub(super) struct RecordingIndicator {
    statuses: Mutex<Vec<(AgentId, ChannelStatus)>>,
    notes: Mutex<Vec<String>>,
}

impl RecordingIndicator {
    pub(super) fn statuses_for(&self, worker: &AgentId) -> Vec<ChannelStatus> {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(id, _)| id == worker)
            .map(|(_, status)| *status)
            .collect()
    }

    pub(super) fn notes(&self) -> Vec<String> {
        self.notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StatusIndicator for RecordingIndicator {
    fn set_status(&self, worker: &AgentId, status: ChannelStatus) {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((worker.clone(), status));
    }

    fn annotate(&self, _worker: &AgentId, note: &str) {
        self.notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(note.to_owned());
    }
}

/// Registry, bus, scripted backend, and recording indicator.
pub(super) struct Rig {
    pub(super) bus: Arc<MessageBus>,
    pub(super) registry: Arc<WorkerRegistry>,
    pub(super) backend: ScriptedBackend,
    pub(super) indicator: Arc<RecordingIndicator>,
}

impl Rig {
    pub(super) fn profile(id: &str) -> WorkerProfile {
        WorkerProfile::teammate(agent(id), id, None, BackendConfig::new("scripted"))
    }

    /// Spawns a scripted worker and returns its session.
    pub(super) async fn add_worker(&self, id: &str) -> ScriptedSession {
        let profile = Self::profile(id);
        self.bus.register_agent(&profile.id);
        let request = SessionRequest {
            profile: profile.clone(),
            tools: WorkerTools::new(
                profile.id.clone(),
                Arc::clone(&self.bus),
                Arc::clone(&self.registry),
            ),
        };
        let session = self.backend.create(request).await.expect("session created");
        self.add_session(profile, session);
        self.backend.session(&agent(id)).expect("scripted session")
    }

    pub(super) fn add_session(&self, profile: WorkerProfile, session: Arc<dyn BackendSession>) {
        assert!(self.registry.insert(ManagedWorker::new(profile, session)));
    }

    pub(super) fn gate(&self, settings: DispatchConfig) -> Arc<DispatchGate> {
        Arc::new(DispatchGate::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.indicator) as Arc<dyn StatusIndicator>,
            settings,
        ))
    }
}

#[fixture]
pub(super) fn rig() -> Rig {
    Rig {
        bus: Arc::new(MessageBus::new()),
        registry: Arc::new(WorkerRegistry::new()),
        backend: ScriptedBackend::new(),
        indicator: Arc::new(RecordingIndicator::default()),
    }
}
