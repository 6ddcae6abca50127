//! Shared environment guards and event builders for integration tests.

use autotest::config::AutotestConfig;
use autotest::config::DeliverableSettings;
use autotest::results::domain::{
    CommentEvent, CommitRecord, CommitSha, CommitUrl, CourseId, DeliverableId, InstanceKind,
    ProjectUrl, PushEvent, RepositoryName, ResultKey, TestOutput, TestStatus, UserName,
};
use chrono::Utc;
use std::env;
use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard, OnceLock};

static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

/// Guard that applies a scoped environment variable update.
pub struct EnvVarGuard {
    previous: Vec<(OsString, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvVarGuard {
    /// Sets multiple environment variables for the guard lifetime.
    pub fn set_many(changes: &[(&str, Option<&str>)]) -> Self {
        let lock = env_lock();
        let mut previous = Vec::with_capacity(changes.len());

        for (key, value) in changes {
            previous.push((OsString::from(key), env::var_os(key)));
            unsafe {
                // SAFETY: the global mutex serializes environment mutations in tests.
                match value {
                    Some(new_value) => env::set_var(key, new_value),
                    None => env::remove_var(key),
                }
            }
        }

        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            unsafe {
                // SAFETY: the global mutex serializes environment mutations in tests.
                match value {
                    Some(previous) => env::set_var(&key, &previous),
                    None => env::remove_var(&key),
                }
            }
        }
    }
}

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Course used by every integration scenario.
pub const COURSE: &str = "310";

/// Configuration for course 310 with open deliverables `d1` (default) and `d2`.
pub fn course_config() -> AutotestConfig {
    let mut config = AutotestConfig {
        instance: InstanceKind::Test,
        course_id: COURSE.to_owned(),
        default_deliverable: Some("d1".to_owned()),
        ..AutotestConfig::default()
    };
    config.recheck.interval_secs = 60;
    config.recheck.max_attempts = 2;
    for id in ["d1", "d2"] {
        config
            .deliverables
            .insert(id.to_owned(), DeliverableSettings::default());
    }
    config
}

/// Builds a 40-character commit hash from a short seed.
pub fn sha(seed: &str) -> String {
    format!("{seed:0>40}")
}

/// Web URL of `sha` in the team repository.
pub fn commit_url(sha: &str) -> CommitUrl {
    CommitUrl::new(format!("https://github.example.com/cs310/team01/commit/{sha}"))
        .expect("valid commit url")
}

fn repo() -> RepositoryName {
    RepositoryName::new("team01").expect("valid repo")
}

fn project() -> ProjectUrl {
    ProjectUrl::new("https://github.example.com/cs310/team01").expect("valid project")
}

/// Push of `sha` to `main`.
pub fn push(sha: &str) -> PushEvent {
    PushEvent::new(
        repo(),
        CommitSha::new(sha).expect("valid sha"),
        commit_url(sha),
        project(),
        Utc::now(),
    )
    .with_branch("main")
    .expect("valid branch")
}

/// Feedback request by `user` on `sha`, optionally naming a deliverable.
pub fn comment(sha: &str, user: &str, deliverable: Option<&str>) -> CommentEvent {
    let event = CommentEvent::new(
        repo(),
        CommitSha::new(sha).expect("valid sha"),
        commit_url(sha),
        project(),
        UserName::new(user).expect("valid user"),
        CourseId::new(COURSE).expect("valid course"),
        Utc::now(),
    );
    match deliverable {
        Some(id) => event.with_deliverable(DeliverableId::new(id).expect("valid deliverable")),
        None => event,
    }
}

/// Successful test output for `sha` against `deliverable`.
pub fn result(sha: &str, deliverable: &str, feedback: &str) -> CommitRecord {
    CommitRecord::new(
        ResultKey::new(
            commit_url(sha),
            DeliverableId::new(deliverable).expect("valid deliverable"),
        ),
        TestOutput::new(TestStatus::Success, feedback),
        Utc::now(),
    )
}
