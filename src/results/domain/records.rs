//! Persisted records owned by the result store.

use super::{
    CommentEvent, CommitUrl, CourseId, DeliverableId, ParseInstanceKindError, PushEvent,
    ResultKey, ResultsDomainError, UserName,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Job specification handed to the external test runner.
///
/// Persisted as the push intent so that queued work can be resumed with its
/// course and deliverable already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInput {
    push: PushEvent,
    course_id: CourseId,
    deliv_id: DeliverableId,
    requested_by: Option<UserName>,
    enqueued_at: DateTime<Utc>,
}

impl ContainerInput {
    /// Creates a job for a push against a resolved deliverable.
    #[must_use]
    pub fn new(
        push: PushEvent,
        course_id: CourseId,
        deliv_id: DeliverableId,
        clock: &impl Clock,
    ) -> Self {
        Self {
            push,
            course_id,
            deliv_id,
            requested_by: None,
            enqueued_at: clock.utc(),
        }
    }

    /// Builds a job for a commit whose test was requested through a comment.
    #[must_use]
    pub fn from_comment(event: &CommentEvent, deliv_id: DeliverableId, clock: &impl Clock) -> Self {
        Self {
            push: event.to_push_event(),
            course_id: event.course_id().clone(),
            deliv_id,
            requested_by: Some(event.user_name().clone()),
            enqueued_at: clock.utc(),
        }
    }

    /// Returns the originating push.
    #[must_use]
    pub const fn push(&self) -> &PushEvent {
        &self.push
    }

    /// Returns the course.
    #[must_use]
    pub const fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    /// Returns the deliverable under test.
    #[must_use]
    pub const fn deliv_id(&self) -> &DeliverableId {
        &self.deliv_id
    }

    /// Returns the user whose comment caused this job, if any.
    #[must_use]
    pub const fn requested_by(&self) -> Option<&UserName> {
        self.requested_by.as_ref()
    }

    /// Returns when the job was created.
    #[must_use]
    pub const fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// Returns the de-duplication key of this job.
    #[must_use]
    pub fn key(&self) -> ResultKey {
        ResultKey::new(self.push.commit_url().clone(), self.deliv_id.clone())
    }
}

/// Overall verdict reported by the test runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// The suite ran to completion.
    Success,
    /// The submission did not build.
    BuildFailed,
    /// The suite exceeded its time budget.
    TimedOut,
    /// The runner failed for reasons unrelated to the submission.
    RunnerError,
}

impl TestStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BuildFailed => "build_failed",
            Self::TimedOut => "timed_out",
            Self::RunnerError => "runner_error",
        }
    }
}

/// Result payload computed by the test runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutput {
    status: TestStatus,
    score: Option<u8>,
    feedback: String,
}

impl TestOutput {
    /// Creates a payload with the runner's markdown feedback.
    #[must_use]
    pub fn new(status: TestStatus, feedback: impl Into<String>) -> Self {
        Self {
            status,
            score: None,
            feedback: feedback.into(),
        }
    }

    /// Sets the percentage score.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsDomainError::ScoreOutOfRange`] above 100.
    pub fn with_score(mut self, score: u8) -> Result<Self, ResultsDomainError> {
        if score > 100 {
            return Err(ResultsDomainError::ScoreOutOfRange(score));
        }
        self.score = Some(score);
        Ok(self)
    }

    /// Returns the verdict.
    #[must_use]
    pub const fn status(&self) -> TestStatus {
        self.status
    }

    /// Returns the percentage score, if graded.
    #[must_use]
    pub const fn score(&self) -> Option<u8> {
        self.score
    }

    /// Returns the runner's feedback text.
    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }
}

/// Stored result of testing a commit against a deliverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    commit_url: CommitUrl,
    deliv_id: DeliverableId,
    output: TestOutput,
    produced_at: DateTime<Utc>,
}

impl CommitRecord {
    /// Creates a record for a completed test.
    #[must_use]
    pub fn new(key: ResultKey, output: TestOutput, produced_at: DateTime<Utc>) -> Self {
        let (commit_url, deliv_id) = key.into_parts();
        Self {
            commit_url,
            deliv_id,
            output,
            produced_at,
        }
    }

    /// Returns the tested commit.
    #[must_use]
    pub const fn commit_url(&self) -> &CommitUrl {
        &self.commit_url
    }

    /// Returns the deliverable tested against.
    #[must_use]
    pub const fn deliv_id(&self) -> &DeliverableId {
        &self.deliv_id
    }

    /// Returns the computed payload.
    #[must_use]
    pub const fn output(&self) -> &TestOutput {
        &self.output
    }

    /// Returns when the result was produced.
    #[must_use]
    pub const fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }

    /// Returns the record's key.
    #[must_use]
    pub fn key(&self) -> ResultKey {
        ResultKey::new(self.commit_url.clone(), self.deliv_id.clone())
    }
}

/// Append-only record that a user actually received feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackGiven {
    course_id: CourseId,
    deliv_id: DeliverableId,
    user_name: UserName,
    commit_url: CommitUrl,
    timestamp: DateTime<Utc>,
}

impl FeedbackGiven {
    /// Creates a grant record.
    #[must_use]
    pub const fn new(
        course_id: CourseId,
        deliv_id: DeliverableId,
        user_name: UserName,
        commit_url: CommitUrl,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            course_id,
            deliv_id,
            user_name,
            commit_url,
            timestamp,
        }
    }

    /// Returns the course.
    #[must_use]
    pub const fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    /// Returns the deliverable.
    #[must_use]
    pub const fn deliv_id(&self) -> &DeliverableId {
        &self.deliv_id
    }

    /// Returns the user who received feedback.
    #[must_use]
    pub const fn user_name(&self) -> &UserName {
        &self.user_name
    }

    /// Returns the commit feedback was given for.
    #[must_use]
    pub const fn commit_url(&self) -> &CommitUrl {
        &self.commit_url
    }

    /// Returns when the feedback was posted.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns `true` when the record belongs to the given quota triple.
    #[must_use]
    pub fn matches(&self, course_id: &CourseId, deliv_id: &DeliverableId, user: &UserName) -> bool {
        &self.course_id == course_id && &self.deliv_id == deliv_id && &self.user_name == user
    }
}

/// Full dump of every collection, for debugging and tests only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Test outputs.
    pub records: Vec<CommitRecord>,
    /// Accepted feedback requests.
    pub comments: Vec<CommentEvent>,
    /// Push intents.
    pub pushes: Vec<ContainerInput>,
    /// Feedback grants.
    pub feedback: Vec<FeedbackGiven>,
}

/// Kind of running instance; only test instances may wipe their store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    /// Ephemeral instance used by automated tests.
    Test,
    /// Long-lived instance serving real users.
    #[default]
    Production,
}

impl InstanceKind {
    /// Returns the canonical configuration representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Production => "production",
        }
    }

    /// Returns `true` when destructive debugging operations are permitted.
    #[must_use]
    pub const fn is_ephemeral(self) -> bool {
        matches!(self, Self::Test)
    }
}

impl TryFrom<&str> for InstanceKind {
    type Error = ParseInstanceKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            _ => Err(ParseInstanceKindError(value.to_owned())),
        }
    }
}
