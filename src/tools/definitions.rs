//! Tool names and their JSON parameter schemas.

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use super::ToolError;

/// Every operation a backend may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    /// Direct message to one worker.
    SendMessage,
    /// Message to every other worker.
    Broadcast,
    /// Drain the caller's unread mail.
    ReadMessages,
    /// Add a task to the board.
    CreateTask,
    /// Take a pending task.
    ClaimTask,
    /// Finish an owned task.
    CompleteTask,
    /// Give up on a task.
    FailTask,
    /// Inspect the board.
    ListTasks,
    /// Inspect the team.
    ListWorkers,
}

impl ToolName {
    /// All tools in registration order.
    pub const ALL: [Self; 9] = [
        Self::SendMessage,
        Self::Broadcast,
        Self::ReadMessages,
        Self::CreateTask,
        Self::ClaimTask,
        Self::CompleteTask,
        Self::FailTask,
        Self::ListTasks,
        Self::ListWorkers,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendMessage => "send_message",
            Self::Broadcast => "broadcast",
            Self::ReadMessages => "read_messages",
            Self::CreateTask => "create_task",
            Self::ClaimTask => "claim_task",
            Self::CompleteTask => "complete_task",
            Self::FailTask => "fail_task",
            Self::ListTasks => "list_tasks",
            Self::ListWorkers => "list_workers",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::SendMessage => "Send a message to one teammate, or to \"*\" for everyone.",
            Self::Broadcast => "Send a message to every other worker.",
            Self::ReadMessages => "Read and mark read all of your unread messages.",
            Self::CreateTask => "Add a task to the shared board.",
            Self::ClaimTask => "Claim a pending task whose dependencies are completed.",
            Self::CompleteTask => "Mark an in-progress task you claimed as completed with a result.",
            Self::FailTask => "Mark a task you claimed, or an unclaimed pending task, as failed with a reason.",
            Self::ListTasks => "List tasks on the shared board.",
            Self::ListWorkers => "List every worker in the team.",
        }
    }

    fn parameters(self) -> Value {
        match self {
            Self::SendMessage => object_schema(
                json!({
                    "to": {"type": "string", "description": "Recipient worker id or \"*\"."},
                    "content": {"type": "string"},
                }),
                &["to", "content"],
            ),
            Self::Broadcast => object_schema(json!({"content": {"type": "string"}}), &["content"]),
            Self::CreateTask => object_schema(
                json!({
                    "description": {"type": "string"},
                    "assignee": {"type": "string"},
                    "depends_on": {"type": "array", "items": {"type": "string"}},
                }),
                &["description"],
            ),
            Self::ClaimTask => object_schema(json!({"task_id": {"type": "string"}}), &["task_id"]),
            Self::CompleteTask => object_schema(
                json!({
                    "task_id": {"type": "string"},
                    "result": {"type": "string"},
                }),
                &["task_id", "result"],
            ),
            Self::FailTask => object_schema(
                json!({
                    "task_id": {"type": "string"},
                    "reason": {"type": "string"},
                }),
                &["task_id", "reason"],
            ),
            Self::ListTasks => object_schema(
                json!({
                    "status": {
                        "type": "string",
                        "enum": ["pending", "in_progress", "completed", "failed"],
                    },
                }),
                &[],
            ),
            Self::ReadMessages | Self::ListWorkers => object_schema(json!({}), &[]),
        }
    }
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ToolName {
    type Error = ToolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == normalized)
            .ok_or_else(|| ToolError::UnknownTool(value.to_owned()))
    }
}

/// Registration record a backend needs to expose a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    /// Wire name.
    pub name: &'static str,
    /// Human readable summary.
    pub description: &'static str,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

impl From<ToolName> for ToolDefinition {
    fn from(tool: ToolName) -> Self {
        Self {
            name: tool.as_str(),
            description: tool.description(),
            parameters: tool.parameters(),
        }
    }
}
