//! Then steps for task board BDD scenarios.

use super::world::{TaskBoardWorld, agent};
use ensemble::bus::domain::{BusError, TaskId, TaskStatus};
use rstest_bdd_macros::then;

#[then(r#"the claim fails as blocked by "{dependency}""#)]
fn claim_blocked(world: &TaskBoardWorld, dependency: String) -> Result<(), eyre::Report> {
    let result = world
        .last_claim
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing claim result"))?;
    let expected = vec![TaskId::new(dependency)];
    if !matches!(result, Err(BusError::DependencyBlocked { blocking, .. }) if *blocking == expected)
    {
        return Err(eyre::eyre!("expected DependencyBlocked error, got {result:?}"));
    }
    Ok(())
}

#[then("the claim fails as not claimable")]
fn claim_not_claimable(world: &TaskBoardWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_claim
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing claim result"))?;
    if !matches!(result, Err(BusError::NotClaimable { .. })) {
        return Err(eyre::eyre!("expected NotClaimable error, got {result:?}"));
    }
    Ok(())
}

#[then("the completion fails as not assigned")]
fn completion_not_assigned(world: &TaskBoardWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_completion
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing completion result"))?;
    if !matches!(result, Err(BusError::NotAssignedToCaller { .. })) {
        return Err(eyre::eyre!(
            "expected NotAssignedToCaller error, got {result:?}"
        ));
    }
    Ok(())
}

#[then("the completion fails as not in progress")]
fn completion_not_in_progress(world: &TaskBoardWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_completion
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing completion result"))?;
    if !matches!(
        result,
        Err(BusError::InvalidTransition {
            status: TaskStatus::Pending,
            ..
        })
    ) {
        return Err(eyre::eyre!("expected InvalidTransition error, got {result:?}"));
    }
    Ok(())
}

#[then(r#""{task}" is still pending"#)]
fn still_pending(world: &TaskBoardWorld, task: String) -> Result<(), eyre::Report> {
    let found = world
        .bus
        .get_task(&TaskId::new(task))
        .ok_or_else(|| eyre::eyre!("missing task"))?;
    eyre::ensure!(
        found.status() == TaskStatus::Pending,
        "expected pending, found {}",
        found.status()
    );
    Ok(())
}

#[then(r#""{task}" is in progress for "{worker}""#)]
fn in_progress_for(world: &TaskBoardWorld, task: String, worker: String) -> Result<(), eyre::Report> {
    let found = world
        .bus
        .get_task(&TaskId::new(task))
        .ok_or_else(|| eyre::eyre!("missing task"))?;
    let expected = agent(&worker)?;
    eyre::ensure!(
        found.status() == TaskStatus::InProgress,
        "expected in_progress, found {}",
        found.status()
    );
    eyre::ensure!(found.assignee() == Some(&expected), "unexpected assignee");
    Ok(())
}
