//! Conversational backend boundary.
//!
//! The engine never interprets backend output beyond forwarding streamed
//! text. Sessions are created per worker through a [`BackendFactory`] and
//! receive the worker's callable tools at creation time.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use domain::{BackendConfig, SessionEvent, SessionRequest};
pub use ports::{BackendError, BackendFactory, BackendResult, BackendSession};

#[cfg(test)]
mod tests;
