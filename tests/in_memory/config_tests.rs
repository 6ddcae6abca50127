//! Configuration loading from files and `AUTOTEST__*` environment overrides.

use crate::test_helpers::EnvVarGuard;
use autotest::config::{AutotestConfig, ConfigError, StorageConfig};
use autotest::results::domain::InstanceKind;
use rstest::rstest;
use std::io::Write;
use std::time::Duration;

const CONFIG_FILE: &str = r#"
instance = "test"
course_id = "310"
default_deliverable = "d1"
default_feedback_interval_secs = 3600

[deliverables.d1]
feedback_interval_secs = 600

[deliverables.d2]
open = false

[storage]
backend = "file"
dir = "/var/lib/autotest"
"#;

const OVERRIDES: [&str; 4] = [
    "AUTOTEST__COURSE_ID",
    "AUTOTEST__PUBLISH__ENABLED",
    "AUTOTEST__PUBLISH__TOKEN",
    "AUTOTEST__RECHECK__MAX_ATTEMPTS",
];

fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
    OVERRIDES.iter().map(|key| (*key, None)).collect()
}

fn write_config() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    file.write_all(CONFIG_FILE.as_bytes()).expect("write config");
    file
}

#[rstest]
fn file_settings_are_loaded() {
    let _env = EnvVarGuard::set_many(&cleared());
    let file = write_config();

    let config =
        AutotestConfig::load(Some(file.path().to_str().expect("utf-8 path"))).expect("load");

    assert_eq!(config.instance, InstanceKind::Test);
    assert_eq!(config.default_feedback_interval(), Duration::from_secs(3600));
    assert_eq!(
        config.storage,
        StorageConfig::File {
            dir: "/var/lib/autotest".to_owned()
        }
    );
    let deliverables = config.deliverables_by_id().expect("valid ids");
    assert_eq!(deliverables.len(), 2);
    assert!(deliverables.values().any(|settings| !settings.open));
}

#[rstest]
fn environment_overrides_file_values() {
    let _env = EnvVarGuard::set_many(&[
        ("AUTOTEST__COURSE_ID", Some("410")),
        ("AUTOTEST__PUBLISH__ENABLED", Some("true")),
        ("AUTOTEST__PUBLISH__TOKEN", Some("ghp_example")),
        ("AUTOTEST__RECHECK__MAX_ATTEMPTS", Some("4")),
    ]);
    let file = write_config();

    let config =
        AutotestConfig::load(Some(file.path().to_str().expect("utf-8 path"))).expect("load");

    assert_eq!(config.course_id, "410");
    assert!(config.publish.enabled);
    assert_eq!(config.publish.token.as_deref(), Some("ghp_example"));
    assert_eq!(config.recheck.max_attempts, 4);
    assert!(!format!("{:?}", config.publish).contains("ghp_example"));
}

#[rstest]
fn enabling_publishing_without_token_is_rejected() {
    let _env = EnvVarGuard::set_many(&[
        ("AUTOTEST__COURSE_ID", None),
        ("AUTOTEST__PUBLISH__ENABLED", Some("true")),
        ("AUTOTEST__PUBLISH__TOKEN", None),
        ("AUTOTEST__RECHECK__MAX_ATTEMPTS", None),
    ]);

    let loaded = AutotestConfig::load(None);

    assert!(matches!(loaded, Err(ConfigError::MissingToken)));
}
