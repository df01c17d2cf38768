//! Output routing for streamed worker text.
//!
//! A worker either writes to its own channel provided by a
//! [`ports::ChannelHost`] or shares one stream with every other worker,
//! prefixed by its display name. The strategy is chosen once when the
//! router is built.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod router;
pub mod sink;

pub use domain::{ChannelId, ChannelStatus};
pub use ports::{ChannelError, ChannelHost, ChannelResult, StatusIndicator};
pub use router::OutputRouter;
pub use sink::{ChannelSink, OutputSink, SharedStreamSink};

#[cfg(test)]
mod tests;
