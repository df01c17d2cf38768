//! Engine configuration.
//!
//! Sources are layered in order of precedence:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. `ENSEMBLE_` environment variables, with `__` between section and
//!    key (`ENSEMBLE_DISPATCH__MAX_TURNS=10`)

use std::{path::Path, time::Duration};

use camino::Utf8PathBuf;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendConfig;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum EngineConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load engine configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value is out of range.
    #[error("invalid engine configuration: {0}")]
    Invalid(String),
}

/// Where prompts for a busy worker wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    /// Hand the prompt to the backend session's own queue.
    #[default]
    Backend,
    /// Hold the prompt in a per-worker FIFO inside the gate.
    Engine,
}

/// Dispatch gate limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Turns a worker may run before further prompts are dropped.
    pub max_turns: u32,
    /// Queueing strategy for busy workers.
    pub queue_mode: QueueMode,
    /// Engine queue capacity per worker.
    pub max_queued: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_turns: 50,
            queue_mode: QueueMode::Backend,
            max_queued: 32,
        }
    }
}

/// Message poller timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Milliseconds between mailbox checks.
    pub interval_ms: u64,
}

impl PollerConfig {
    /// Returns the tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

/// Output sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Dedicated channels when a channel directory is configured,
    /// otherwise the shared stream.
    #[default]
    Auto,
    /// Always use dedicated channels.
    Channels,
    /// Always use the shared stream.
    Shared,
}

/// Output router settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Sink selection.
    pub mode: OutputMode,
    /// Directory receiving one log and title file per worker.
    pub channel_dir: Option<Utf8PathBuf>,
}

/// Completion wait settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Milliseconds between quiescence checks.
    pub settle_interval_ms: u64,
}

impl CompletionConfig {
    /// Returns the check interval.
    #[must_use]
    pub const fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            settle_interval_ms: 250,
        }
    }
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            json: false,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Dispatch gate limits.
    pub dispatch: DispatchConfig,
    /// Poller timing.
    pub poller: PollerConfig,
    /// Output routing.
    pub output: OutputConfig,
    /// Backend used by workers that do not bring their own.
    pub backend: BackendConfig,
    /// Completion wait settings.
    pub completion: CompletionConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Loads configuration from defaults, `path`, and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`EngineConfigError::Load`] when the file is missing or
    /// malformed and [`EngineConfigError::Invalid`] when a value is out of
    /// range.
    pub fn load(path: Option<&Path>) -> Result<Self, EngineConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = path {
            builder = builder.add_source(File::from(file).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("ENSEMBLE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks values that would stall the engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineConfigError::Invalid`] for zero intervals or an
    /// empty engine queue with `queue_mode = engine`.
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.poller.interval_ms == 0 {
            return Err(EngineConfigError::Invalid(
                "poller.interval_ms must be at least 1".to_owned(),
            ));
        }
        if self.completion.settle_interval_ms == 0 {
            return Err(EngineConfigError::Invalid(
                "completion.settle_interval_ms must be at least 1".to_owned(),
            ));
        }
        if self.dispatch.queue_mode == QueueMode::Engine && self.dispatch.max_queued == 0 {
            return Err(EngineConfigError::Invalid(
                "dispatch.max_queued must be at least 1 in engine queue mode".to_owned(),
            ));
        }
        Ok(())
    }
}
