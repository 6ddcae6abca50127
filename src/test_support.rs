//! Fixtures shared by unit tests across contexts.

use crate::results::domain::{
    CommentEvent, CommitRecord, CommitSha, CommitUrl, ContainerInput, CourseId, DeliverableId,
    FeedbackGiven, ProjectUrl, PushEvent, RepositoryName, ResultKey, StoreSnapshot, TestOutput,
    TestStatus, UserName,
};
use crate::results::ports::{ResultStore, ResultStoreError, ResultStoreResult};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::{Arc, Mutex, PoisonError};

/// Clock whose time only moves when a test advances it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(epoch())
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0)
        .single()
        .expect("valid fixed timestamp")
}

pub const SHA_A: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";
pub const SHA_B: &str = "b1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

pub fn commit_url(sha: &str) -> CommitUrl {
    CommitUrl::new(format!("https://github.example.com/cs310/team01/commit/{sha}"))
        .expect("valid commit url")
}

pub fn deliv(raw: &str) -> DeliverableId {
    DeliverableId::new(raw).expect("valid deliverable")
}

pub fn course() -> CourseId {
    CourseId::new("310").expect("valid course")
}

pub fn user(raw: &str) -> UserName {
    UserName::new(raw).expect("valid user")
}

pub fn push_event(sha: &str) -> PushEvent {
    PushEvent::new(
        RepositoryName::new("team01").expect("valid repo"),
        CommitSha::new(sha).expect("valid sha"),
        commit_url(sha),
        ProjectUrl::new("https://github.example.com/cs310/team01").expect("valid project"),
        epoch(),
    )
    .with_branch("refs/heads/main")
    .expect("valid branch")
}

pub fn comment_event(sha: &str, user_name: &str, deliverable: Option<&str>) -> CommentEvent {
    let event = CommentEvent::new(
        RepositoryName::new("team01").expect("valid repo"),
        CommitSha::new(sha).expect("valid sha"),
        commit_url(sha),
        ProjectUrl::new("https://github.example.com/cs310/team01").expect("valid project"),
        user(user_name),
        course(),
        epoch(),
    );
    match deliverable {
        Some(id) => event.with_deliverable(deliv(id)),
        None => event,
    }
}

pub fn output_record(sha: &str, deliverable: &str, feedback: &str) -> CommitRecord {
    let output = TestOutput::new(TestStatus::Success, feedback)
        .with_score(80)
        .expect("valid score");
    CommitRecord::new(
        ResultKey::new(commit_url(sha), deliv(deliverable)),
        output,
        epoch(),
    )
}

mockall::mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl ResultStore for Store {
        async fn save_push(
            &self,
            input: &ContainerInput,
        ) -> ResultStoreResult<()>;
        async fn get_push_record(
            &self,
            commit_url: &CommitUrl,
        ) -> ResultStoreResult<Option<ContainerInput>>;
        async fn save_comment(
            &self,
            event: &CommentEvent,
        ) -> ResultStoreResult<()>;
        async fn get_comment_record(
            &self,
            commit_url: &CommitUrl,
            deliv_id: &DeliverableId,
        ) -> ResultStoreResult<Option<CommentEvent>>;
        async fn save_output_record(
            &self,
            record: &CommitRecord,
        ) -> ResultStoreResult<()>;
        async fn get_output_record(
            &self,
            commit_url: &CommitUrl,
            deliv_id: &DeliverableId,
        ) -> ResultStoreResult<Option<CommitRecord>>;
        async fn save_feedback_given_record(
            &self,
            record: &FeedbackGiven,
        ) -> ResultStoreResult<()>;
        async fn get_latest_feedback_given_record(
            &self,
            course_id: &CourseId,
            deliv_id: &DeliverableId,
            user_name: &UserName,
        ) -> ResultStoreResult<Option<FeedbackGiven>>;
        async fn get_feedback_given_record_for_commit(
            &self,
            commit_url: &CommitUrl,
            user_name: &UserName,
        ) -> ResultStoreResult<Option<FeedbackGiven>>;
        async fn get_feedback_given_records_for_commit(
            &self,
            commit_url: &CommitUrl,
            user_name: &UserName,
        ) -> ResultStoreResult<Vec<FeedbackGiven>>;
        async fn get_all_data(
            &self,
        ) -> ResultStoreResult<StoreSnapshot>;
        async fn clear_data(&self) -> ResultStoreResult<()>;
    }
}

/// Error used to simulate an unavailable store.
pub fn store_down() -> ResultStoreError {
    ResultStoreError::persistence(std::io::Error::other("store down"))
}
