//! Shared world state for task board BDD scenarios.

use ensemble::bus::{
    MessageBus,
    domain::{AgentId, BusResult, Task},
};
use rstest::fixture;

/// Scenario world for task board behaviour tests.
pub struct TaskBoardWorld {
    pub bus: MessageBus,
    pub last_claim: Option<BusResult<Task>>,
    pub last_completion: Option<BusResult<Task>>,
}

impl TaskBoardWorld {
    /// Creates a world with an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bus: MessageBus::new(),
            last_claim: None,
            last_completion: None,
        }
    }
}

impl Default for TaskBoardWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskBoardWorld {
    TaskBoardWorld::default()
}

/// Parses a worker id from step text.
///
/// # Errors
///
/// Returns an error when `id` is not a valid worker id.
pub fn agent(id: &str) -> Result<AgentId, eyre::Report> {
    AgentId::new(id).map_err(|err| eyre::eyre!("invalid agent id in scenario: {err}"))
}
