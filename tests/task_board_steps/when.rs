//! When steps for task board BDD scenarios.

use super::world::{TaskBoardWorld, agent};
use ensemble::bus::domain::TaskId;
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#""{worker}" claims "{task}""#)]
fn claims(world: &mut TaskBoardWorld, worker: String, task: String) -> Result<(), eyre::Report> {
    let result = world.bus.claim_task(&TaskId::new(task), &agent(&worker)?);
    world.last_claim = Some(result);
    Ok(())
}

#[when(r#""{worker}" completes "{task}" with "{result}""#)]
fn completes(
    world: &mut TaskBoardWorld,
    worker: String,
    task: String,
    result: String,
) -> Result<(), eyre::Report> {
    let outcome = world
        .bus
        .complete_task(&TaskId::new(task), &agent(&worker)?, &result);
    world.last_completion = Some(outcome);
    Ok(())
}

#[when(r#""{worker}" fails "{task}" because "{reason}""#)]
fn fails(
    world: &mut TaskBoardWorld,
    worker: String,
    task: String,
    reason: String,
) -> Result<(), eyre::Report> {
    world
        .bus
        .fail_task(&TaskId::new(task), &agent(&worker)?, &reason)
        .wrap_err("fail task in scenario")?;
    Ok(())
}
