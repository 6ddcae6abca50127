//! Result store contract against `PostgreSQL`.

use super::helpers::{connect, fresh_sha};
use crate::test_helpers::{comment, commit_url, push, result};
use autotest::results::{
    domain::{
        ContainerInput, CourseId, DeliverableId, FeedbackGiven, InstanceKind, UserName,
    },
    ports::{ResultStore, ResultStoreError},
};
use chrono::{TimeDelta, Utc};
use mockable::DefaultClock;
use rstest::rstest;
use std::sync::Arc;

fn d1() -> DeliverableId {
    DeliverableId::new("d1").expect("valid deliverable")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn push_comment_and_output_round_trip() {
    let Some(store) = connect(InstanceKind::Test).await else {
        return;
    };
    let sha = fresh_sha();
    let input = ContainerInput::new(
        push(&sha),
        CourseId::new("310").expect("valid course"),
        d1(),
        &DefaultClock,
    );
    let request = comment(&sha, "alice", Some("d1"));

    store.save_push(&input).await.expect("save push");
    store.save_comment(&request).await.expect("save comment");
    store
        .save_output_record(&result(&sha, "d1", "stored in postgres"))
        .await
        .expect("save output");

    assert_eq!(
        store.get_push_record(&commit_url(&sha)).await.expect("read push"),
        Some(input)
    );
    assert_eq!(
        store
            .get_comment_record(&commit_url(&sha), &d1())
            .await
            .expect("read comment"),
        Some(request)
    );
    let output = store
        .get_output_record(&commit_url(&sha), &d1())
        .await
        .expect("read output")
        .expect("output present");
    assert_eq!(output.output().feedback(), "stored in postgres");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_output_for_a_key_is_rejected() {
    let Some(store) = connect(InstanceKind::Test).await else {
        return;
    };
    let sha = fresh_sha();
    store
        .save_output_record(&result(&sha, "d1", "first"))
        .await
        .expect("first save");

    let second = store.save_output_record(&result(&sha, "d1", "second")).await;

    assert!(matches!(
        second,
        Err(ResultStoreError::DuplicateOutputRecord(_))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_output_writes_store_exactly_one() {
    let Some(store) = connect(InstanceKind::Test).await else {
        return;
    };
    let shared = Arc::new(store);
    let sha = fresh_sha();

    let mut handles = Vec::new();
    for attempt in 0..6 {
        let writer = Arc::clone(&shared);
        let record = result(&sha, "d1", &format!("run {attempt}"));
        handles.push(tokio::spawn(async move {
            writer.save_output_record(&record).await
        }));
    }
    let mut stored = 0;
    for handle in handles {
        if handle.await.expect("join").is_ok() {
            stored += 1;
        }
    }
    assert_eq!(stored, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn latest_grant_is_chosen_by_timestamp() {
    let Some(store) = connect(InstanceKind::Test).await else {
        return;
    };
    let user = UserName::new(format!("user-{}", fresh_sha())).expect("valid user");
    let course = CourseId::new("310").expect("valid course");
    let now = Utc::now();
    let older = fresh_sha();
    let newer = fresh_sha();
    for (sha, offset) in [(&newer, 30), (&older, 10)] {
        store
            .save_feedback_given_record(&FeedbackGiven::new(
                course.clone(),
                d1(),
                user.clone(),
                commit_url(sha),
                now + TimeDelta::minutes(offset),
            ))
            .await
            .expect("save grant");
    }

    let latest = store
        .get_latest_feedback_given_record(&course, &d1(), &user)
        .await
        .expect("read")
        .expect("grant present");
    assert_eq!(latest.commit_url(), &commit_url(&newer));
    let for_commit = store
        .get_feedback_given_record_for_commit(&commit_url(&older), &user)
        .await
        .expect("read");
    assert!(for_commit.is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn grants_for_a_commit_cover_every_deliverable() {
    let Some(store) = connect(InstanceKind::Test).await else {
        return;
    };
    let user = UserName::new(format!("user-{}", fresh_sha())).expect("valid user");
    let course = CourseId::new("310").expect("valid course");
    let sha = fresh_sha();
    let now = Utc::now();
    for (deliv, offset) in [("d1", 0), ("d2", 5)] {
        store
            .save_feedback_given_record(&FeedbackGiven::new(
                course.clone(),
                DeliverableId::new(deliv).expect("valid deliverable"),
                user.clone(),
                commit_url(&sha),
                now + TimeDelta::minutes(offset),
            ))
            .await
            .expect("save grant");
    }

    let grants = store
        .get_feedback_given_records_for_commit(&commit_url(&sha), &user)
        .await
        .expect("read");
    let delivs: Vec<&str> = grants.iter().map(|grant| grant.deliv_id().as_str()).collect();
    assert_eq!(delivs, ["d1", "d2"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clearing_a_production_store_is_refused() {
    let Some(store) = connect(InstanceKind::Production).await else {
        return;
    };
    let cleared = store.clear_data().await;
    assert!(matches!(
        cleared,
        Err(ResultStoreError::ClearForbidden(InstanceKind::Production))
    ));
}
