//! Unit tests for output sinks, channel hosts, and the router.


use std::{
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    backend::BackendConfig,
    bus::domain::AgentId,
    dispatch::WorkerProfile,
};

pub(super) fn agent(id: &str) -> AgentId {
    AgentId::new(id).expect("valid agent id")
}

pub(super) fn profile(id: &str, name: &str) -> WorkerProfile {
    WorkerProfile::teammate(agent(id), name, None, BackendConfig::new("gpt-4.1"))
}

/// Cloneable writer capturing everything written to it.
#[derive(Debug, Clone, Default)]
pub(super) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub(super) fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
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
