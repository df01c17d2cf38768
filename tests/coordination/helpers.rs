//! Shared helpers for coordinator integration tests.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use ensemble::{
    Coordinator,
    backend::adapters::ScriptedBackend,
    bus::domain::AgentId,
    config::EngineConfig,
    output::{OutputRouter, adapters::InMemoryChannelHost},
};
use rstest::fixture;

/// Upper bound for a team to go quiet.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Parses a worker id.
///
/// # Errors
///
/// Returns an error when `id` is not a valid worker id.
pub fn agent(id: &str) -> eyre::Result<AgentId> {
    AgentId::new(id).map_err(|err| eyre::eyre!("invalid agent id {id}: {err}"))
}

/// Configuration with short poll and settle intervals.
#[must_use]
pub fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.poller.interval_ms = 10;
    config.completion.settle_interval_ms = 5;
    config
}

/// Coordinator over a scripted backend and in-memory channels.
pub struct ChannelTeam {
    pub coordinator: Coordinator,
    pub backend: ScriptedBackend,
    pub host: InMemoryChannelHost,
}

/// Provides a started-ready team writing to in-memory channels.
#[fixture]
pub fn channel_team() -> ChannelTeam {
    let backend = ScriptedBackend::new();
    let host = InMemoryChannelHost::new();
    let coordinator = Coordinator::with_router(
        fast_config(),
        Arc::new(backend.clone()),
        OutputRouter::with_channels(Arc::new(host.clone())),
    )
    .expect("valid engine config");
    ChannelTeam {
        coordinator,
        backend,
        host,
    }
}

/// Cloneable writer capturing shared-stream output.
#[derive(Debug, Clone, Default)]
pub struct CapturedStream(Arc<Mutex<Vec<u8>>>);

impl CapturedStream {
    /// Returns everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CapturedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Polls `condition` until it holds or roughly a second passes.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
