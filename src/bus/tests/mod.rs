//! Unit tests for the message bus.


use crate::bus::{MessageBus, domain::AgentId};
use rstest::fixture;

pub(super) fn agent(id: &str) -> AgentId {
    AgentId::new(id).expect("valid agent id")
}

/// A bus with `lead`, `alice`, and `bob` registered.
#[fixture]
pub(super) fn team_bus() -> MessageBus {
    let bus = MessageBus::new();
    for id in ["lead", "alice", "bob"] {
        bus.register_agent(&agent(id));
    }
    bus
}
