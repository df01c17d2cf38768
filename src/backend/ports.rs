//! Backend session and factory ports.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use super::domain::{SessionEvent, SessionRequest};

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// One live conversational session driving a single worker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Sends `prompt` and resolves when the resulting turn completes.
    async fn send_and_wait(&self, prompt: &str) -> BackendResult<()>;

    /// Queues `prompt` behind the running turn and returns immediately.
    async fn enqueue(&self, prompt: &str) -> BackendResult<()>;

    /// Returns a receiver for the session's streaming events.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    /// Number of prompts accepted through [`Self::enqueue`] that have not
    /// finished yet.
    fn pending(&self) -> usize;

    /// Tears the session down. Later calls fail with
    /// [`BackendError::SessionClosed`].
    async fn destroy(&self) -> BackendResult<()>;
}

/// Opens backend sessions for workers.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// Creates a session for the worker described by `request`.
    async fn create(&self, request: SessionRequest) -> BackendResult<Arc<dyn BackendSession>>;
}

/// Errors returned by backend adapters.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Credentials were rejected.
    #[error("backend authentication failed: {0}")]
    Authentication(String),

    /// The call did not complete in time.
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    /// Network or protocol failure.
    #[error("backend transport error: {0}")]
    Transport(String),

    /// The session was destroyed.
    #[error("backend session closed")]
    SessionClosed,

    /// Generic runtime failure.
    #[error("backend runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

const AUTH_MARKERS: [&str; 6] = [
    "401",
    "403",
    "unauthorized",
    "forbidden",
    "authentication",
    "invalid api key",
];

impl BackendError {
    /// Wraps a runtime error from a backend adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }

    /// Returns `true` for the fatal authentication class.
    ///
    /// Transport and runtime failures whose message carries an HTTP 401 or
    /// 403 status or a credential complaint are classified the same way.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        match self {
            Self::Authentication(_) => true,
            Self::Transport(message) => mentions_credentials(message),
            Self::Runtime(err) => mentions_credentials(&err.to_string()),
            Self::Timeout(_) | Self::SessionClosed => false,
        }
    }
}

fn mentions_credentials(message: &str) -> bool {
    let lowered = message.to_lowercase();
    AUTH_MARKERS.iter().any(|marker| lowered.contains(marker))
}
