//! Ensemble: coordination engine for teams of backend-driven workers.
//!
//! A lead worker and any number of teammates exchange messages and share a
//! dependency-aware task board, while each worker is driven by a slow,
//! non-preemptible conversational backend.
//!
//! # Architecture
//!
//! Ensemble follows hexagonal architecture principles:
//!
//! - **Domain**: messages, tasks, worker profiles, and channel status
//! - **Ports**: backend sessions and channel hosts
//! - **Adapters**: a scripted backend plus in-memory and on-disk channels
//!
//! # Modules
//!
//! - [`bus`]: mailboxes, broadcast delivery, and the task board
//! - [`dispatch`]: single-flight, turn-limited admission to backends
//! - [`poller`]: timer-driven delivery of unread mail
//! - [`output`]: routing of streamed text to channels or a shared stream
//! - [`tools`]: operations injected into backend sessions
//! - [`coordinator`]: the public engine lifecycle

pub mod backend;
pub mod bus;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod output;
pub mod poller;
pub mod telemetry;
pub mod tools;

pub use coordinator::{Completion, Coordinator, CoordinatorError, CoordinatorResult};
