//! Storage strategy selection through configuration.

use super::helpers::{config, start};
use crate::test_helpers::{comment, result, sha};
use autotest::app::{AutoTest, StartupError};
use autotest::config::{AutotestConfig, ConfigError, StorageConfig};
use autotest::feedback::domain::CommentOutcome;
use autotest::results::{domain::InstanceKind, ports::ResultStoreError};
use rstest::rstest;

fn file_config(mut config: AutotestConfig, dir: &tempfile::TempDir) -> AutotestConfig {
    let path = dir.path().join("results");
    config.storage = StorageConfig::File {
        dir: path.to_str().expect("utf-8 path").to_owned(),
    };
    config
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn file_backend_keeps_results_and_grants_across_restarts(config: AutotestConfig) {
    let dir = tempfile::tempdir().expect("temp dir");
    let commit = sha("f1");

    let first = start(file_config(config.clone(), &dir)).await;
    first
        .on_test_complete(result(&commit, "d1", "persisted report"))
        .await
        .expect("record");
    first
        .on_comment(comment(&commit, "alice", None))
        .await
        .expect("first request");
    drop(first);

    let second = start(file_config(config, &dir)).await;
    let outcome = second
        .on_comment(comment(&commit, "alice", None))
        .await
        .expect("repeat request");
    assert_eq!(outcome, CommentOutcome::Posted { charged: false });
    let snapshot = second.store().get_all_data().await.expect("dump");
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.feedback.len(), 1);
}

#[rstest]
#[case(InstanceKind::Test, true)]
#[case(InstanceKind::Production, false)]
#[tokio::test(flavor = "multi_thread")]
async fn clearing_is_limited_to_test_instances(
    mut config: AutotestConfig,
    #[case] instance: InstanceKind,
    #[case] permitted: bool,
) {
    config.instance = instance;
    let app = start(config).await;
    app.on_test_complete(result(&sha("f2"), "d1", "report"))
        .await
        .expect("record");

    let cleared = app.store().clear_data().await;

    assert_eq!(cleared.is_ok(), permitted);
    if !permitted {
        assert!(matches!(cleared, Err(ResultStoreError::ClearForbidden(_))));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_configuration_prevents_startup(mut config: AutotestConfig) {
    config.default_deliverable = Some("d9".to_owned());

    let started = AutoTest::start(config).await;

    assert!(matches!(
        started,
        Err(StartupError::Config(ConfigError::UnknownDefaultDeliverable(_)))
    ));
}
