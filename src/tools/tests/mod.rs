//! Unit tests for worker tools.


use std::sync::Arc;

use crate::{
    bus::{MessageBus, domain::AgentId},
    dispatch::WorkerRegistry,
    tools::WorkerTools,
};
use rstest::fixture;

pub(super) fn agent(id: &str) -> AgentId {
    AgentId::new(id).expect("valid agent id")
}

pub(super) struct Team {
    pub(super) bus: Arc<MessageBus>,
    pub(super) workers: Arc<WorkerRegistry>,
}

impl Team {
    pub(super) fn tools(&self, id: &str) -> WorkerTools {
        WorkerTools::new(agent(id), Arc::clone(&self.bus), Arc::clone(&self.workers))
    }
}

/// Bus with `lead`, `alice`, and `bob` registered and no workers.
#[fixture]
pub(super) fn team() -> Team {
    let bus = Arc::new(MessageBus::new());
    for id in ["lead", "alice", "bob"] {
        bus.register_agent(&agent(id));
    }
    Team {
        bus,
        workers: Arc::new(WorkerRegistry::new()),
    }
}
