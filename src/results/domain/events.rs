//! Inbound repository events handed to the orchestration core.

use super::{
    CommitSha, CommitUrl, CourseId, DeliverableId, ProjectUrl, RepositoryName, ResultsDomainError,
    UserName,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification that commits were pushed to a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEvent {
    repo: RepositoryName,
    commit: CommitSha,
    commit_url: CommitUrl,
    project_url: ProjectUrl,
    branch: Option<String>,
    timestamp: DateTime<Utc>,
}

impl PushEvent {
    /// Creates a push event for the head commit of a push.
    #[must_use]
    pub const fn new(
        repo: RepositoryName,
        commit: CommitSha,
        commit_url: CommitUrl,
        project_url: ProjectUrl,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            repo,
            commit,
            commit_url,
            project_url,
            branch: None,
            timestamp,
        }
    }

    /// Sets the pushed branch; a `refs/heads/` prefix is removed.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsDomainError::EmptyBranch`] when the branch name is
    /// empty after trimming.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Result<Self, ResultsDomainError> {
        let raw = branch.into();
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix("refs/heads/").unwrap_or(trimmed);
        if name.is_empty() {
            return Err(ResultsDomainError::EmptyBranch);
        }
        self.branch = Some(name.to_owned());
        Ok(self)
    }

    /// Returns the repository name.
    #[must_use]
    pub const fn repo(&self) -> &RepositoryName {
        &self.repo
    }

    /// Returns the head commit hash.
    #[must_use]
    pub const fn commit(&self) -> &CommitSha {
        &self.commit
    }

    /// Returns the head commit URL.
    #[must_use]
    pub const fn commit_url(&self) -> &CommitUrl {
        &self.commit_url
    }

    /// Returns the repository URL.
    #[must_use]
    pub const fn project_url(&self) -> &ProjectUrl {
        &self.project_url
    }

    /// Returns the pushed branch, when known.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Returns when the push happened.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Feedback-request comment left on a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEvent {
    repo: RepositoryName,
    commit: CommitSha,
    commit_url: CommitUrl,
    project_url: ProjectUrl,
    user_name: UserName,
    deliv_id: Option<DeliverableId>,
    course_id: CourseId,
    timestamp: DateTime<Utc>,
}

impl CommentEvent {
    /// Creates a comment event that does not name a deliverable.
    #[must_use]
    pub const fn new(
        repo: RepositoryName,
        commit: CommitSha,
        commit_url: CommitUrl,
        project_url: ProjectUrl,
        user_name: UserName,
        course_id: CourseId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            repo,
            commit,
            commit_url,
            project_url,
            user_name,
            deliv_id: None,
            course_id,
            timestamp,
        }
    }

    /// Sets the deliverable named in the comment.
    #[must_use]
    pub fn with_deliverable(mut self, deliv_id: DeliverableId) -> Self {
        self.deliv_id = Some(deliv_id);
        self
    }

    /// Returns the repository name.
    #[must_use]
    pub const fn repo(&self) -> &RepositoryName {
        &self.repo
    }

    /// Returns the commented commit hash.
    #[must_use]
    pub const fn commit(&self) -> &CommitSha {
        &self.commit
    }

    /// Returns the commented commit URL.
    #[must_use]
    pub const fn commit_url(&self) -> &CommitUrl {
        &self.commit_url
    }

    /// Returns the repository URL.
    #[must_use]
    pub const fn project_url(&self) -> &ProjectUrl {
        &self.project_url
    }

    /// Returns the requesting user.
    #[must_use]
    pub const fn user_name(&self) -> &UserName {
        &self.user_name
    }

    /// Returns the deliverable named in the comment, if any.
    #[must_use]
    pub const fn deliv_id(&self) -> Option<&DeliverableId> {
        self.deliv_id.as_ref()
    }

    /// Returns the course the repository belongs to.
    #[must_use]
    pub const fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    /// Returns when the comment was made.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Builds the push event equivalent used to queue a test for this commit.
    #[must_use]
    pub fn to_push_event(&self) -> PushEvent {
        PushEvent::new(
            self.repo.clone(),
            self.commit.clone(),
            self.commit_url.clone(),
            self.project_url.clone(),
            self.timestamp,
        )
    }
}

/// Mutual-exclusion and de-duplication key: one test result per commit and
/// deliverable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultKey {
    commit_url: CommitUrl,
    deliv_id: DeliverableId,
}

impl ResultKey {
    /// Creates a key for a commit and deliverable.
    #[must_use]
    pub const fn new(commit_url: CommitUrl, deliv_id: DeliverableId) -> Self {
        Self {
            commit_url,
            deliv_id,
        }
    }

    /// Returns the commit URL component.
    #[must_use]
    pub const fn commit_url(&self) -> &CommitUrl {
        &self.commit_url
    }

    /// Returns the deliverable component.
    #[must_use]
    pub const fn deliv_id(&self) -> &DeliverableId {
        &self.deliv_id
    }

    /// Splits the key into its commit URL and deliverable.
    #[must_use]
    pub fn into_parts(self) -> (CommitUrl, DeliverableId) {
        (self.commit_url, self.deliv_id)
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.deliv_id, self.commit_url)
    }
}
