//! Then steps for commit feedback BDD scenarios.

use super::world::{FeedbackWorld, run_async};
use autotest::feedback::{domain::CommentOutcome, services::CommentError};
use autotest::results::domain::UserName;
use rstest_bdd_macros::then;

fn expect_outcome(
    world: &FeedbackWorld,
    matches: impl Fn(&CommentOutcome) -> bool,
    label: &str,
) -> Result<(), eyre::Report> {
    match world.last_outcome()? {
        Ok(outcome) if matches(outcome) => Ok(()),
        Ok(outcome) => Err(eyre::eyre!("expected {label}, got {outcome:?}")),
        Err(err) => Err(eyre::eyre!("expected {label}, request failed: {err}")),
    }
}

#[then("the request is posted and charged")]
fn posted_and_charged(world: &FeedbackWorld) -> Result<(), eyre::Report> {
    expect_outcome(
        world,
        |outcome| *outcome == CommentOutcome::Posted { charged: true },
        "a charged post",
    )
}

#[then("the request is posted without charge")]
fn posted_free(world: &FeedbackWorld) -> Result<(), eyre::Report> {
    expect_outcome(
        world,
        |outcome| *outcome == CommentOutcome::Posted { charged: false },
        "a free post",
    )
}

#[then("the request is denied")]
fn denied(world: &FeedbackWorld) -> Result<(), eyre::Report> {
    expect_outcome(
        world,
        |outcome| matches!(outcome, CommentOutcome::Denied { .. }),
        "a denial",
    )
}

#[then("the request is deferred")]
fn deferred(world: &FeedbackWorld) -> Result<(), eyre::Report> {
    expect_outcome(
        world,
        |outcome| matches!(outcome, CommentOutcome::Deferred { .. }),
        "a deferral",
    )
}

#[then("the request is refused as an unknown deliverable")]
fn refused(world: &FeedbackWorld) -> Result<(), eyre::Report> {
    match world.last_outcome()? {
        Err(CommentError::UnknownDeliverable { .. }) => Ok(()),
        other => Err(eyre::eyre!("expected unknown deliverable, got {other:?}")),
    }
}

#[then(r#"a message containing "{text}" is posted"#)]
fn message_posted(world: &FeedbackWorld, text: String) -> Result<(), eyre::Report> {
    let messages = world.app()?.published_messages();
    if messages.iter().any(|message| message.body().contains(&text)) {
        Ok(())
    } else {
        Err(eyre::eyre!("no posted message contains {text:?}"))
    }
}

#[then(r#""{user}" holds feedback grants: {count:usize}"#)]
fn holds_grants(world: &FeedbackWorld, user: String, count: usize) -> Result<(), eyre::Report> {
    let user_name = UserName::new(user.as_str())?;
    let snapshot = run_async(world.app()?.store().get_all_data())?;
    let held = snapshot
        .feedback
        .iter()
        .filter(|grant| grant.user_name() == &user_name)
        .count();
    if held == count {
        Ok(())
    } else {
        Err(eyre::eyre!("expected {count} grants for {user}, found {held}"))
    }
}

#[then("queued test jobs: {count:usize}")]
fn jobs_queued(world: &FeedbackWorld, count: usize) -> Result<(), eyre::Report> {
    let queued = world.app()?.jobs().len()?;
    if queued == count {
        Ok(())
    } else {
        Err(eyre::eyre!("expected {count} queued jobs, found {queued}"))
    }
}
