//! Given steps for commit feedback BDD scenarios.

use super::world::{FeedbackWorld, run_async};
use crate::test_helpers::{course_config, result, sha};
use autotest::app::AutoTest;
use autotest::config::DeliverableSettings;
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"course "{course}" with open deliverable "{deliverable}""#)]
fn course_with_deliverable(
    world: &mut FeedbackWorld,
    course: String,
    deliverable: String,
) -> Result<(), eyre::Report> {
    let mut config = course_config();
    config.course_id = course;
    config.deliverables.clear();
    config
        .deliverables
        .insert(deliverable.clone(), DeliverableSettings::default());
    config.default_deliverable = Some(deliverable);
    let app = run_async(AutoTest::start(config)).wrap_err("start service")?;
    world.app = Some(app);
    Ok(())
}

#[given(r#"commit "{seed}" was tested for "{deliverable}" with feedback "{feedback}""#)]
fn commit_was_tested(
    world: &mut FeedbackWorld,
    seed: String,
    deliverable: String,
    feedback: String,
) -> Result<(), eyre::Report> {
    let app = world.app()?;
    run_async(app.on_test_complete(result(&sha(&seed), &deliverable, &feedback)))
        .wrap_err("record test output")?;
    Ok(())
}
