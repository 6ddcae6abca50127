//! Result store port: durable record of pushes, comments, outputs and grants.

use crate::results::domain::{
    CommentEvent, CommitRecord, CommitUrl, ContainerInput, CourseId, DeliverableId,
    FeedbackGiven, InstanceKind, ResultKey, StoreSnapshot, UserName,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for result store operations.
pub type ResultStoreResult<T> = Result<T, ResultStoreError>;

/// Persistence contract shared by every storage backend.
///
/// Writes are appends; no operation rewrites an existing record. Output
/// records are unique per [`ResultKey`] and backends must reject a second
/// write for the same key atomically.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persists the intent to test a push against a deliverable.
    async fn save_push(&self, input: &ContainerInput) -> ResultStoreResult<()>;

    /// Returns the first push intent recorded for a commit.
    async fn get_push_record(
        &self,
        commit_url: &CommitUrl,
    ) -> ResultStoreResult<Option<ContainerInput>>;

    /// Persists an accepted feedback request.
    async fn save_comment(&self, event: &CommentEvent) -> ResultStoreResult<()>;

    /// Returns the first accepted request for a commit and deliverable.
    async fn get_comment_record(
        &self,
        commit_url: &CommitUrl,
        deliv_id: &DeliverableId,
    ) -> ResultStoreResult<Option<CommentEvent>>;

    /// Persists a finished test output.
    ///
    /// # Errors
    ///
    /// Returns [`ResultStoreError::DuplicateOutputRecord`] when an output for
    /// the same commit and deliverable already exists.
    async fn save_output_record(&self, record: &CommitRecord) -> ResultStoreResult<()>;

    /// Returns the output for a commit and deliverable.
    async fn get_output_record(
        &self,
        commit_url: &CommitUrl,
        deliv_id: &DeliverableId,
    ) -> ResultStoreResult<Option<CommitRecord>>;

    /// Appends a feedback grant.
    async fn save_feedback_given_record(&self, record: &FeedbackGiven) -> ResultStoreResult<()>;

    /// Returns the grant with the greatest timestamp for the quota triple.
    async fn get_latest_feedback_given_record(
        &self,
        course_id: &CourseId,
        deliv_id: &DeliverableId,
        user_name: &UserName,
    ) -> ResultStoreResult<Option<FeedbackGiven>>;

    /// Returns a grant made to the user for the given commit, if any.
    async fn get_feedback_given_record_for_commit(
        &self,
        commit_url: &CommitUrl,
        user_name: &UserName,
    ) -> ResultStoreResult<Option<FeedbackGiven>>;

    /// Returns every grant made to the user for the given commit, oldest first.
    async fn get_feedback_given_records_for_commit(
        &self,
        commit_url: &CommitUrl,
        user_name: &UserName,
    ) -> ResultStoreResult<Vec<FeedbackGiven>>;

    /// Dumps every collection. Debugging only.
    async fn get_all_data(&self) -> ResultStoreResult<StoreSnapshot>;

    /// Erases every collection.
    ///
    /// # Errors
    ///
    /// Returns [`ResultStoreError::ClearForbidden`] unless the store belongs
    /// to a test instance.
    async fn clear_data(&self) -> ResultStoreResult<()>;
}

/// Errors returned by result store implementations.
#[derive(Debug, Clone, Error)]
pub enum ResultStoreError {
    /// An output for the key is already stored.
    #[error("output record already exists for {0}")]
    DuplicateOutputRecord(ResultKey),

    /// `clear_data` was invoked on a non-test instance.
    #[error("clear_data is only permitted on test instances (instance is {})", .0.as_str())]
    ClearForbidden(InstanceKind),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ResultStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Returns an error unless `instance` permits destructive operations.
///
/// # Errors
///
/// Returns [`ResultStoreError::ClearForbidden`] for non-test instances.
pub const fn ensure_clear_permitted(instance: InstanceKind) -> ResultStoreResult<()> {
    if instance.is_ephemeral() {
        Ok(())
    } else {
        Err(ResultStoreError::ClearForbidden(instance))
    }
}
