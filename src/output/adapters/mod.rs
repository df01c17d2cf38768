//! Channel host adapters.

pub mod directory;
pub mod memory;

pub use directory::DirectoryChannelHost;
pub use memory::InMemoryChannelHost;
