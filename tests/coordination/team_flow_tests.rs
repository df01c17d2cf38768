//! Delegation, broadcasts, and dependency chains across a team.

use ensemble::{
    Completion,
    backend::adapters::ScriptedTurn,
    bus::domain::{TaskFilter, TaskId, TaskStatus},
    tools::ToolCall,
};
use rstest::rstest;
use serde_json::json;

use super::helpers::{ChannelTeam, SETTLE_TIMEOUT, agent, channel_team};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn broadcast_reaches_every_teammate(channel_team: ChannelTeam) -> eyre::Result<()> {
    let team = channel_team;
    team.backend.script(
        &agent("lead")?,
        ScriptedTurn::reply("Announced.").with_tool_call(ToolCall::new(
            "broadcast",
            json!({ "content": "standup in five" }),
        )),
    );
    team.coordinator.start()?;
    team.coordinator.create_lead(None).await?;
    for name in ["Alice", "Bob"] {
        team.coordinator.spawn_teammate(name, "", "", None).await?;
    }

    team.coordinator.submit_task("Call a standup").await?;
    let completion = team.coordinator.wait_for_completion(SETTLE_TIMEOUT).await;

    eyre::ensure!(completion == Completion::Settled, "team did not settle");
    for id in ["alice", "bob"] {
        let session = team
            .backend
            .session(&agent(id)?)
            .ok_or_else(|| eyre::eyre!("missing session for {id}"))?;
        eyre::ensure!(
            session.prompts() == ["You have 1 new message:\n[lead to all] standup in five\n"],
            "unexpected prompts for {id}: {:?}",
            session.prompts()
        );
    }
    let lead = team
        .backend
        .session(&agent("lead")?)
        .ok_or_else(|| eyre::eyre!("missing lead session"))?;
    eyre::ensure!(lead.prompts() == ["Call a standup"], "lead received its own broadcast");

    team.coordinator.stop().await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dependent_task_waits_for_its_prerequisite(channel_team: ChannelTeam) -> eyre::Result<()> {
    let team = channel_team;
    team.backend.script(
        &agent("lead")?,
        ScriptedTurn::reply("Planned.")
            .with_tool_call(ToolCall::new(
                "create_task",
                json!({ "description": "Design schema", "assignee": "alice" }),
            ))
            .with_tool_call(ToolCall::new(
                "create_task",
                json!({ "description": "Write migration", "depends_on": ["task-1"] }),
            ))
            .with_tool_call(ToolCall::new(
                "send_message",
                json!({ "to": "bob", "content": "take task-2 when it unblocks" }),
            )),
    );
    team.backend.script(
        &agent("bob")?,
        ScriptedTurn::reply("Blocked for now.")
            .with_tool_call(ToolCall::new("claim_task", json!({ "task_id": "task-2" }))),
    );
    team.coordinator.start()?;
    team.coordinator.create_lead(None).await?;
    team.coordinator.spawn_teammate("Alice", "schemas", "", None).await?;
    team.coordinator.spawn_teammate("Bob", "migrations", "", None).await?;

    team.coordinator.submit_task("Add a users table").await?;
    let completion = team.coordinator.wait_for_completion(SETTLE_TIMEOUT).await;
    eyre::ensure!(completion == Completion::Settled, "team did not settle");

    let bob = team
        .backend
        .session(&agent("bob")?)
        .ok_or_else(|| eyre::eyre!("missing bob session"))?;
    let outcomes = bob.tool_outcomes();
    let blocked = outcomes
        .first()
        .and_then(|outcome| outcome.error.as_ref())
        .ok_or_else(|| eyre::eyre!("claim should have failed"))?;
    eyre::ensure!(blocked.kind == "dependency_blocked", "unexpected kind {}", blocked.kind);

    let bus = team.coordinator.bus();
    bus.claim_task(&TaskId::new("task-1"), &agent("alice")?)?;
    bus.complete_task(&TaskId::new("task-1"), &agent("alice")?, "schema ready")?;
    let claimed = bus.claim_task(&TaskId::new("task-2"), &agent("bob")?)?;
    eyre::ensure!(claimed.status() == TaskStatus::InProgress, "task-2 not in progress");

    let pending = bus.list_tasks(&TaskFilter::all().with_status(TaskStatus::Pending));
    eyre::ensure!(pending.is_empty(), "unexpected pending tasks: {pending:?}");

    team.coordinator.stop().await?;
    Ok(())
}
