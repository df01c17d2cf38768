//! Coordinator errors.

use thiserror::Error;

use crate::{
    backend::BackendError, bus::domain::AgentId, bus::domain::BusError,
    config::EngineConfigError, dispatch::DispatchError, output::ChannelError,
};

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Errors surfaced by the coordinator's public lifecycle.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The engine has not been started.
    #[error("coordinator is not started")]
    NotStarted,

    /// `start` was called twice.
    #[error("coordinator is already started")]
    AlreadyStarted,

    /// Work was submitted before a lead exists.
    #[error("no lead worker has been created")]
    LeadMissing,

    /// A second lead was requested.
    #[error("a lead worker already exists")]
    LeadExists,

    /// A worker with this id is already running.
    #[error("worker {0} already exists")]
    DuplicateWorker(AgentId),

    /// No worker with this id is running.
    #[error("unknown worker: {0}")]
    UnknownWorker(AgentId),

    /// A teammate name does not yield a usable worker id.
    #[error("invalid worker name: {0:?}")]
    InvalidName(String),

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] EngineConfigError),

    /// Bus failure.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Backend session failure.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Dispatch failure.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Output channel failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Failures collected while tearing the engine down.
    #[error("teardown finished with {} error(s): {}", .0.len(), .0.join("; "))]
    Teardown(Vec<String>),
}

impl CoordinatorError {
    /// Returns `true` for authentication failures that should abort the
    /// run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Backend(err) => err.is_authentication(),
            Self::Dispatch(err) => err.is_fatal(),
            _ => false,
        }
    }
}
