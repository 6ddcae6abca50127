//! When steps for commit feedback BDD scenarios.

use super::world::{FeedbackWorld, run_async};
use crate::test_helpers::{comment, sha};
use rstest_bdd_macros::when;

#[when(r#""{user}" requests feedback on commit "{seed}""#)]
fn request_feedback(
    world: &mut FeedbackWorld,
    user: String,
    seed: String,
) -> Result<(), eyre::Report> {
    let outcome = run_async(world.app()?.on_comment(comment(&sha(&seed), &user, None)));
    world.last_outcome = Some(outcome);
    Ok(())
}

#[when(r#""{user}" requests feedback for deliverable "{deliverable}" on commit "{seed}""#)]
fn request_feedback_for_deliverable(
    world: &mut FeedbackWorld,
    user: String,
    deliverable: String,
    seed: String,
) -> Result<(), eyre::Report> {
    let event = comment(&sha(&seed), &user, Some(&deliverable));
    let outcome = run_async(world.app()?.on_comment(event));
    world.last_outcome = Some(outcome);
    Ok(())
}
