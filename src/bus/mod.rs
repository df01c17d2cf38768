//! In-memory message bus: worker mailboxes plus the shared task board.
//!
//! - Domain types in [`domain`]
//! - Per-worker stores in [`mailbox`]
//! - Dependency-aware task records in [`board`]
//! - Lifecycle notifications in [`events`]
//! - The composed [`MessageBus`] service in [`service`]
//!
//! Storage is process-local; nothing survives a restart.

pub mod board;
pub mod domain;
pub mod events;
pub mod mailbox;
pub mod service;

pub use service::MessageBus;

#[cfg(test)]
mod tests;
