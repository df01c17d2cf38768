//! Backend adapters.

pub mod scripted;

pub use scripted::{ScriptedBackend, ScriptedSession, ScriptedTurn};
