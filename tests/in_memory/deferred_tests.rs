//! Requests for commits whose test result has not arrived yet.
//!
//! Time is paused so re-check timers fire as soon as the runtime idles.

use super::helpers::{bodies, config, start};
use crate::test_helpers::{comment, result, sha};
use autotest::config::AutotestConfig;
use autotest::feedback::domain::CommentOutcome;
use rstest::rstest;
use std::time::Duration;

const RECHECK: Duration = Duration::from_secs(60);

#[rstest]
#[tokio::test(start_paused = true)]
async fn request_before_result_is_answered_after_test_completes(config: AutotestConfig) {
    let app = start(config).await;
    let commit = sha("e1");

    let outcome = app
        .on_comment(comment(&commit, "alice", None))
        .await
        .expect("comment");
    assert!(matches!(outcome, CommentOutcome::Deferred { .. }));
    let job = app.jobs().take().expect("queue").expect("job queued");
    assert_eq!(
        job.job().requested_by().map(|user| user.as_str()),
        Some("alice")
    );

    app.on_test_complete(result(&commit, "d1", "late but green"))
        .await
        .expect("record");
    tokio::time::sleep(RECHECK + Duration::from_secs(5)).await;

    let posted = bodies(&app);
    assert_eq!(posted.len(), 1);
    assert!(posted.iter().all(|body| body.contains("late but green")));
    let snapshot = app.store().get_all_data().await.expect("dump");
    assert_eq!(snapshot.feedback.len(), 1);
    assert_eq!(snapshot.comments.len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn request_without_result_times_out(config: AutotestConfig) {
    let app = start(config).await;
    let commit = sha("e2");

    app.on_comment(comment(&commit, "alice", None))
        .await
        .expect("comment");
    tokio::time::sleep(RECHECK * 3).await;

    let posted = bodies(&app);
    assert_eq!(posted.len(), 1);
    assert!(posted.iter().all(|body| body.contains("did not complete in time")));
    let snapshot = app.store().get_all_data().await.expect("dump");
    assert!(snapshot.feedback.is_empty());
    assert!(app.scheduler().get_all_tasks().iter().all(|task| task.completed()));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn shutdown_abandons_waiting_requests(config: AutotestConfig) {
    let app = start(config).await;
    let commit = sha("e3");

    app.on_comment(comment(&commit, "alice", None))
        .await
        .expect("comment");
    app.shutdown();
    tokio::time::sleep(RECHECK * 3).await;

    assert!(bodies(&app).is_empty());
    assert!(app.scheduler().is_shut_down());
    assert_eq!(app.scheduler().pending_count(), 0);
}
