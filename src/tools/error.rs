//! Tool invocation errors.

use thiserror::Error;

use crate::bus::domain::{BusError, ParseTaskStatusError};

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Failures reported back to the calling backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// The bus rejected the operation.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// A status filter did not name a task status.
    #[error(transparent)]
    InvalidStatus(#[from] ParseTaskStatusError),

    /// No tool is registered under this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The JSON arguments did not match the tool's parameters.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// Parser message.
        reason: String,
    },

    /// The result could not be rendered as JSON.
    #[error("failed to encode {tool} result: {reason}")]
    Encoding {
        /// Tool name.
        tool: String,
        /// Serializer message.
        reason: String,
    },
}

impl ToolError {
    /// Returns a stable snake-case label for structured results.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bus(err) => err.kind(),
            Self::InvalidStatus(_) => "invalid_status",
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::Encoding { .. } => "encoding",
        }
    }
}
