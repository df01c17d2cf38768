//! Structured tool failures handed back to the backend.

use ensemble::{
    Completion,
    backend::{BackendError, adapters::ScriptedTurn},
    tools::ToolCall,
};
use rstest::rstest;
use serde_json::json;

use super::helpers::{ChannelTeam, SETTLE_TIMEOUT, agent, channel_team};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bad_tool_calls_return_error_kinds(channel_team: ChannelTeam) -> eyre::Result<()> {
    let team = channel_team;
    team.backend.script(
        &agent("lead")?,
        ScriptedTurn::reply("Trying things.")
            .with_tool_call(ToolCall::new("send_message", json!({ "to": "nobody", "content": "hi" })))
            .with_tool_call(ToolCall::new("claim_task", json!({ "task_id": "task-9" })))
            .with_tool_call(ToolCall::new("deploy", json!({})))
            .with_tool_call(ToolCall::new("list_tasks", json!({ "status": "stalled" }))),
    );
    team.coordinator.start()?;
    team.coordinator.create_lead(None).await?;

    team.coordinator.submit_task("Poke the tools").await?;

    let lead = team
        .backend
        .session(&agent("lead")?)
        .ok_or_else(|| eyre::eyre!("missing lead session"))?;
    let kinds: Vec<String> = lead
        .tool_outcomes()
        .into_iter()
        .filter_map(|outcome| outcome.error.map(|failure| failure.kind))
        .collect();
    eyre::ensure!(
        kinds == ["unknown_recipient", "task_not_found", "unknown_tool", "invalid_status"],
        "unexpected kinds: {kinds:?}"
    );
    team.coordinator.stop().await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_turn_is_recorded_and_engine_keeps_running(
    channel_team: ChannelTeam,
) -> eyre::Result<()> {
    let team = channel_team;
    team.backend.script(
        &agent("lead")?,
        ScriptedTurn::failing(BackendError::Transport("connection reset".to_owned())),
    );
    team.coordinator.start()?;
    team.coordinator.create_lead(None).await?;

    let failed = team.coordinator.submit_task("First attempt").await;
    eyre::ensure!(failed.is_err(), "first turn should fail");
    eyre::ensure!(
        !failed.as_ref().is_err_and(|err| err.is_fatal()),
        "transport errors are not fatal"
    );
    let lead = team
        .coordinator
        .get_worker(&agent("lead")?)
        .ok_or_else(|| eyre::eyre!("lead missing"))?;
    eyre::ensure!(!lead.busy, "lead left busy");
    eyre::ensure!(
        lead.last_error.as_deref() == Some("backend transport error: connection reset"),
        "unexpected last error: {:?}",
        lead.last_error
    );

    team.coordinator.submit_task("Second attempt").await?;
    let completion = team.coordinator.wait_for_completion(SETTLE_TIMEOUT).await;
    eyre::ensure!(completion == Completion::Settled, "team did not settle");
    team.coordinator.stop().await?;
    Ok(())
}
