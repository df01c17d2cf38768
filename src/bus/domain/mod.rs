//! Domain model for worker messaging and the shared task board.
//!
//! Domain types carry no locking or scheduling concerns; the bus service
//! owns the stores that hold them.

mod error;
mod event;
mod ids;
mod message;
mod task;

pub use error::{BusError, BusResult};
pub use event::BusEvent;
pub use ids::{AgentId, BROADCAST_ADDRESS, MessageId, Recipient, SubscriptionId, TaskId};
pub use message::AgentMessage;
pub use task::{ParseTaskStatusError, Task, TaskFilter, TaskOptions, TaskStatus};
