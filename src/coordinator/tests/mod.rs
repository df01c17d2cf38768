//! Unit tests for the coordinator lifecycle.


use std::sync::Arc;

use rstest::fixture;

use super::Coordinator;
use crate::{
    backend::adapters::ScriptedBackend,
    bus::domain::AgentId,
    config::EngineConfig,
    output::{OutputRouter, adapters::InMemoryChannelHost},
};

pub(super) fn agent(id: &str) -> AgentId {
    AgentId::new(id).expect("valid agent id")
}

/// Coordinator wired to a scripted backend and in-memory channels.
pub(super) struct Team {
    pub(super) coordinator: Coordinator,
    pub(super) backend: ScriptedBackend,
    pub(super) host: InMemoryChannelHost,
}

pub(super) fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.poller.interval_ms = 10;
    config.completion.settle_interval_ms = 5;
    config
}

pub(super) fn team_with(config: EngineConfig) -> Team {
    let backend = ScriptedBackend::new();
    let host = InMemoryChannelHost::new();
    let coordinator = Coordinator::with_router(
        config,
        Arc::new(backend.clone()),
        OutputRouter::with_channels(Arc::new(host.clone())),
    )
    .expect("valid engine config");
    Team {
        coordinator,
        backend,
        host,
    }
}

#[fixture]
pub(super) fn team() -> Team {
    team_with(fast_config())
}
