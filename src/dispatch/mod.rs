//! Single-flight, turn-limited admission of prompts to worker backends.
//!
//! [`DispatchGate`] is the only code that changes a worker's busy flag or
//! turn counter. Everything that wants a worker to run a prompt goes
//! through the [`Dispatcher`] seam.

mod gate;
mod registry;
mod worker;

pub use gate::{DispatchError, DispatchGate, DispatchOutcome, DispatchResult, Dispatcher, DropReason};
#[cfg(test)]
pub use gate::MockDispatcher;
pub use registry::WorkerRegistry;
pub use worker::{LEAD_ID, ManagedWorker, WorkerProfile, WorkerRole, WorkerSnapshot};

#[cfg(test)]
mod tests;
