//! Output routing through a running coordinator.

use std::sync::Arc;

use ensemble::{
    Completion, Coordinator,
    backend::adapters::{ScriptedBackend, ScriptedTurn},
    output::{ChannelId, OutputRouter},
};
use rstest::rstest;

use super::helpers::{
    CapturedStream, ChannelTeam, SETTLE_TIMEOUT, agent, channel_team, eventually, fast_config,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shared_stream_prefixes_worker_names() -> eyre::Result<()> {
    let backend = ScriptedBackend::new();
    let stream = CapturedStream::default();
    let coordinator = Coordinator::with_router(
        fast_config(),
        Arc::new(backend.clone()),
        OutputRouter::with_shared_stream(stream.clone()),
    )?;
    backend.script(
        &agent("lead")?,
        ScriptedTurn::reply("Looking").with_delta(" into it.\nDone"),
    );
    coordinator.start()?;
    coordinator.create_lead(None).await?;

    coordinator.submit_task("Check the build").await?;
    let settled = coordinator.wait_for_completion(SETTLE_TIMEOUT).await;

    eyre::ensure!(settled == Completion::Settled, "team did not settle");
    let expected = "[Lead] Looking into it.\n[Lead] Done\n";
    eyre::ensure!(
        eventually(|| stream.contents() == expected).await,
        "unexpected stream output: {:?}",
        stream.contents()
    );
    coordinator.stop().await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn channel_titles_follow_worker_status(channel_team: ChannelTeam) -> eyre::Result<()> {
    let team = channel_team;
    team.coordinator.start()?;
    team.coordinator.create_lead(None).await?;
    team.coordinator.submit_task("Say hello").await?;
    team.coordinator.stop().await?;

    let titles = team.host.titles(&ChannelId::new("lead"));
    eyre::ensure!(
        titles
            == [
                "◐ Lead [default]",
                "○ Lead [default]",
                "● Lead [default]",
                "○ Lead [default]",
                "✓ Lead [default]",
            ],
        "unexpected titles: {titles:?}"
    );
    eyre::ensure!(team.host.is_closed(&ChannelId::new("lead")), "channel still open");
    Ok(())
}
