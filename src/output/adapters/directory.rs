//! Channel host backed by one log file per worker.
//!
//! Channel `<worker>` writes its text to `<dir>/<worker>.log` and keeps
//! its current title in `<dir>/<worker>.title`.

use std::{
    collections::HashSet,
    io::Write,
    sync::{Mutex, MutexGuard, PoisonError},
};

use camino::Utf8Path;
use cap_std::{
    ambient_authority,
    fs_utf8::{Dir, OpenOptions},
};

use crate::{
    bus::domain::AgentId,
    output::{
        domain::ChannelId,
        ports::{ChannelError, ChannelHost, ChannelResult},
    },
};

/// Channel host writing through a capability handle on one directory.
#[derive(Debug)]
pub struct DirectoryChannelHost {
    dir: Dir,
    open: Mutex<HashSet<ChannelId>>,
}

impl DirectoryChannelHost {
    /// Opens `path`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(path: &Utf8Path) -> ChannelResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self::from_dir(dir))
    }

    /// Wraps an already opened directory.
    #[must_use]
    pub fn from_dir(dir: Dir) -> Self {
        Self {
            dir,
            open: Mutex::new(HashSet::new()),
        }
    }

    fn open_channels(&self) -> MutexGuard<'_, HashSet<ChannelId>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self, channel: &ChannelId) -> ChannelResult<()> {
        if self.open_channels().contains(channel) {
            return Ok(());
        }
        if self.dir.exists(log_name(channel)) {
            return Err(ChannelError::Closed(channel.clone()));
        }
        Err(ChannelError::NotFound(channel.clone()))
    }
}

fn log_name(channel: &ChannelId) -> String {
    format!("{channel}.log")
}

fn title_name(channel: &ChannelId) -> String {
    format!("{channel}.title")
}

impl ChannelHost for DirectoryChannelHost {
    fn create(&self, worker: &AgentId, title: &str) -> ChannelResult<ChannelId> {
        let id = ChannelId::for_worker(worker);
        self.dir.create(log_name(&id))?;
        self.dir.write(title_name(&id), title)?;
        self.open_channels().insert(id.clone());
        Ok(id)
    }

    fn write(&self, channel: &ChannelId, text: &str) -> ChannelResult<()> {
        self.ensure_open(channel)?;
        let mut options = OpenOptions::new();
        options.append(true);
        let mut file = self.dir.open_with(log_name(channel), &options)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }

    fn set_title(&self, channel: &ChannelId, title: &str) -> ChannelResult<()> {
        self.ensure_open(channel)?;
        self.dir.write(title_name(channel), title)?;
        Ok(())
    }

    fn close(&self, channel: &ChannelId) -> ChannelResult<()> {
        self.ensure_open(channel)?;
        self.open_channels().remove(channel);
        Ok(())
    }
}
