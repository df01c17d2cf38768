//! JSON entry point for backend tool calls.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::{ToolDefinition, ToolError, ToolName, ToolResult, WorkerTools};

/// A tool call as issued by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool wire name.
    pub name: String,
    /// Arguments object.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Creates a tool call.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Error payload of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    /// Stable error label, e.g. `dependency_blocked`.
    pub kind: String,
    /// Human readable message.
    pub message: String,
}

/// Result handed back to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Payload of a successful call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
}

impl ToolOutcome {
    /// Wraps a successful payload.
    #[must_use]
    pub const fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Wraps a failure.
    #[must_use]
    pub fn failure(err: &ToolError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ToolFailure {
                kind: err.kind().to_owned(),
                message: err.to_string(),
            }),
        }
    }

    /// Renders the outcome as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match (&self.data, &self.error) {
            (_, Some(failure)) => json!({
                "ok": false,
                "error": {"kind": failure.kind, "message": failure.message},
            }),
            (data, None) => json!({"ok": true, "data": data.clone().unwrap_or(Value::Null)}),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SendMessageArgs {
    to: String,
    content: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ContentArgs {
    content: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateTaskArgs {
    description: String,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    depends_on: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskIdArgs {
    task_id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CompleteTaskArgs {
    task_id: String,
    result: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FailTaskArgs {
    task_id: String,
    reason: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ListTasksArgs {
    #[serde(default)]
    status: Option<String>,
}

impl WorkerTools {
    /// Returns the definitions of every tool.
    #[must_use]
    pub fn definitions() -> Vec<ToolDefinition> {
        ToolName::ALL.into_iter().map(ToolDefinition::from).collect()
    }

    /// Executes a JSON tool call.
    ///
    /// Failures are reported inside the outcome so the backend receives a
    /// structured result instead of an aborted turn.
    #[must_use]
    pub fn invoke(&self, call: &ToolCall) -> ToolOutcome {
        match self.try_invoke(call) {
            Ok(data) => {
                debug!(worker = %self.agent(), tool = %call.name, "tool call succeeded");
                ToolOutcome::success(data)
            }
            Err(err) => {
                debug!(
                    worker = %self.agent(),
                    tool = %call.name,
                    kind = err.kind(),
                    error = %err,
                    "tool call failed"
                );
                ToolOutcome::failure(&err)
            }
        }
    }

    fn try_invoke(&self, call: &ToolCall) -> ToolResult<Value> {
        let tool = ToolName::try_from(call.name.as_str())?;
        match tool {
            ToolName::SendMessage => {
                let args: SendMessageArgs = parse_args(tool, &call.arguments)?;
                to_value(tool, &self.send_message(&args.to, &args.content)?)
            }
            ToolName::Broadcast => {
                let args: ContentArgs = parse_args(tool, &call.arguments)?;
                to_value(tool, &self.broadcast(&args.content)?)
            }
            ToolName::ReadMessages => to_value(tool, &self.read_messages()),
            ToolName::CreateTask => {
                let args: CreateTaskArgs = parse_args(tool, &call.arguments)?;
                let task =
                    self.create_task(&args.description, args.assignee.as_deref(), &args.depends_on)?;
                to_value(tool, &task)
            }
            ToolName::ClaimTask => {
                let args: TaskIdArgs = parse_args(tool, &call.arguments)?;
                to_value(tool, &self.claim_task(&args.task_id)?)
            }
            ToolName::CompleteTask => {
                let args: CompleteTaskArgs = parse_args(tool, &call.arguments)?;
                to_value(tool, &self.complete_task(&args.task_id, &args.result)?)
            }
            ToolName::FailTask => {
                let args: FailTaskArgs = parse_args(tool, &call.arguments)?;
                to_value(tool, &self.fail_task(&args.task_id, &args.reason)?)
            }
            ToolName::ListTasks => {
                let args: ListTasksArgs = parse_args(tool, &call.arguments)?;
                to_value(tool, &self.list_tasks(args.status.as_deref())?)
            }
            ToolName::ListWorkers => to_value(tool, &self.list_workers()),
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, arguments: &Value) -> ToolResult<T> {
    let object = if arguments.is_null() {
        Value::Object(Map::new())
    } else {
        arguments.clone()
    };
    serde_json::from_value(object).map_err(|err| ToolError::InvalidArguments {
        tool: tool.as_str().to_owned(),
        reason: err.to_string(),
    })
}

fn to_value(tool: ToolName, payload: &impl Serialize) -> ToolResult<Value> {
    serde_json::to_value(payload).map_err(|err| ToolError::Encoding {
        tool: tool.as_str().to_owned(),
        reason: err.to_string(),
    })
}
