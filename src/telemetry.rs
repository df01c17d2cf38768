//! Tracing initialisation and span helpers.

use thiserror::Error;
use tracing::Span;
use tracing_subscriber::{
    EnvFilter, filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    util::TryInitError,
};
use uuid::Uuid;

use crate::{bus::domain::AgentId, config::LoggingConfig};

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter directive does not parse.
    #[error("invalid log filter: {0}")]
    InvalidFilter(#[from] ParseError),

    /// A global subscriber is already installed.
    #[error("tracing subscriber already initialised: {0}")]
    AlreadyInitialised(#[from] TryInitError),
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter` when set.
///
/// # Errors
///
/// Returns [`TelemetryError`] for unparsable filters or when a subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.filter))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(config.json.then(|| fmt::layer().json().with_current_span(true)))
        .with((!config.json).then(|| fmt::layer().compact()))
        .try_init()?;
    tracing::debug!(json = config.json, "tracing initialised");
    Ok(())
}

/// Span wrapping one backend turn of `worker`.
#[must_use]
pub fn dispatch_span(worker: &AgentId, turn: u32) -> Span {
    tracing::info_span!(
        "dispatch_turn",
        worker = %worker,
        turn,
        correlation.id = %correlation_id(),
    )
}

/// Generates a correlation id for linking related log lines.
#[must_use]
pub fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}
