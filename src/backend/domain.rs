//! Backend configuration and session values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{dispatch::WorkerProfile, tools::WorkerTools};

/// Model selection and provider options for one backend session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Model identifier shown in channel titles.
    pub model: String,
    /// Optional provider name.
    pub provider: Option<String>,
    /// Provider specific settings passed through untouched.
    pub options: BTreeMap<String, Value>,
}

impl BackendConfig {
    /// Creates a configuration for `model` with no provider options.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Sets the provider name.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Adds a provider option, replacing any previous value for `key`.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: "default".to_owned(),
            provider: None,
            options: BTreeMap::new(),
        }
    }
}

/// Streaming notification emitted by a backend session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Incremental response text.
    Delta(String),
    /// The current turn finished.
    TurnComplete,
}

/// Everything a factory needs to open a session for one worker.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Identity, role, and backend selection of the worker.
    pub profile: WorkerProfile,
    /// Callable operations bound to the worker's identity.
    pub tools: WorkerTools,
}
