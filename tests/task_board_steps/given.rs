//! Given steps for task board BDD scenarios.

use super::world::{TaskBoardWorld, agent};
use ensemble::bus::domain::{TaskId, TaskOptions};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"registered workers "{ids}""#)]
fn registered_workers(world: &mut TaskBoardWorld, ids: String) -> Result<(), eyre::Report> {
    for id in ids.split(',') {
        world.bus.register_agent(&agent(id.trim())?);
    }
    Ok(())
}

#[given(r#""{creator}" posts task "{description}""#)]
fn posts_task(
    world: &mut TaskBoardWorld,
    creator: String,
    description: String,
) -> Result<(), eyre::Report> {
    world
        .bus
        .create_task(&description, &agent(&creator)?, TaskOptions::new())
        .wrap_err("create task in scenario setup")?;
    Ok(())
}

#[given(r#""{creator}" posts dependent task "{description}" after "{dependency}""#)]
fn posts_dependent_task(
    world: &mut TaskBoardWorld,
    creator: String,
    description: String,
    dependency: String,
) -> Result<(), eyre::Report> {
    let options = TaskOptions {
        depends_on: vec![TaskId::new(dependency)],
        ..TaskOptions::new()
    };
    world
        .bus
        .create_task(&description, &agent(&creator)?, options)
        .wrap_err("create dependent task in scenario setup")?;
    Ok(())
}

#[given(r#""{creator}" assigns "{description}" to "{assignee}""#)]
fn assigns_task(
    world: &mut TaskBoardWorld,
    creator: String,
    description: String,
    assignee: String,
) -> Result<(), eyre::Report> {
    let options = TaskOptions {
        assignee: Some(agent(&assignee)?),
        ..TaskOptions::new()
    };
    world
        .bus
        .create_task(&description, &agent(&creator)?, options)
        .wrap_err("create reserved task in scenario setup")?;
    Ok(())
}

#[given(r#""{creator}" reserves "{description}" for "{assignee}" after "{dependency}""#)]
fn assigns_dependent_task(
    world: &mut TaskBoardWorld,
    creator: String,
    description: String,
    assignee: String,
    dependency: String,
) -> Result<(), eyre::Report> {
    let options = TaskOptions {
        assignee: Some(agent(&assignee)?),
        depends_on: vec![TaskId::new(dependency)],
    };
    world
        .bus
        .create_task(&description, &agent(&creator)?, options)
        .wrap_err("create reserved dependent task in scenario setup")?;
    Ok(())
}
