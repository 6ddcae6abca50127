//! Push, test completion and feedback flows through the assembled service.

use super::helpers::{bodies, config, start};
use crate::test_helpers::{comment, commit_url, push, result, sha};
use autotest::config::AutotestConfig;
use autotest::dispatch::domain::{QueueDecision, RecordOutcome};
use autotest::feedback::{domain::CommentOutcome, services::CommentError};
use autotest::results::domain::DeliverableId;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn push_to_feedback_round_trip(config: AutotestConfig) {
    let app = start(config).await;
    let commit = sha("a1");

    let dispatched = app.on_push(push(&commit)).await.expect("push");
    assert_eq!(dispatched.queued_count(), 1);
    let job = app
        .jobs()
        .take()
        .expect("queue readable")
        .expect("job queued");
    assert_eq!(job.job().deliv_id().as_str(), "d1");

    let recorded = app
        .on_test_complete(result(&commit, "d1", "12 of 12 tests pass"))
        .await
        .expect("record");
    assert_eq!(recorded, RecordOutcome::Stored);

    let outcome = app
        .on_comment(comment(&commit, "alice", None))
        .await
        .expect("comment");
    assert_eq!(outcome, CommentOutcome::Posted { charged: true });
    assert!(
        bodies(&app)
            .iter()
            .any(|body| body.contains("12 of 12 tests pass"))
    );
    let messages = app.published_messages();
    assert!(
        messages
            .iter()
            .all(|message| message.url() == commit_url(&commit).as_str())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_pushes_queue_one_job(config: AutotestConfig) {
    let app = start(config).await;
    let commit = sha("b2");

    app.on_push(push(&commit)).await.expect("first push");
    let second = app.on_push(push(&commit)).await.expect("second push");

    assert!(second.is_noop());
    assert_eq!(app.jobs().len().expect("len"), 1);

    app.jobs().drain().expect("drain");
    app.on_test_complete(result(&commit, "d1", "done"))
        .await
        .expect("record");
    let third = app.on_push(push(&commit)).await.expect("third push");
    assert_eq!(
        third.decisions().first().map(|(_, decision)| *decision),
        Some(QueueDecision::AlreadyTested)
    );
    assert!(app.jobs().is_empty().expect("empty"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cooldown_denies_second_commit_but_not_other_users(config: AutotestConfig) {
    let app = start(config).await;
    let first = sha("c1");
    let second = sha("c2");
    for commit in [&first, &second] {
        app.on_test_complete(result(commit, "d1", "report"))
            .await
            .expect("record");
    }

    app.on_comment(comment(&first, "alice", None))
        .await
        .expect("alice first");
    let denied = app
        .on_comment(comment(&second, "alice", None))
        .await
        .expect("alice second");
    let other_user = app
        .on_comment(comment(&second, "bob", None))
        .await
        .expect("bob");

    assert!(matches!(denied, CommentOutcome::Denied { .. }));
    assert_eq!(other_user, CommentOutcome::Posted { charged: true });
    let snapshot = app.store().get_all_data().await.expect("dump");
    assert_eq!(snapshot.feedback.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_deliverable_is_refused(mut config: AutotestConfig) {
    config.deliverables.entry("d2".to_owned()).and_modify(|settings| {
        settings.open = false;
    });
    let app = start(config).await;

    let result = app.on_comment(comment(&sha("d4"), "alice", Some("d2"))).await;

    let expected = DeliverableId::new("d2").expect("valid id");
    assert!(matches!(
        result,
        Err(CommentError::UnknownDeliverable { requested: Some(ref id), .. }) if *id == expected
    ));
    assert!(app.jobs().is_empty().expect("empty"));
    assert_eq!(bodies(&app).len(), 1);
}
