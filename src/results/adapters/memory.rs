//! In-memory result store for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::results::{
    domain::{
        CommentEvent, CommitRecord, CommitUrl, ContainerInput, CourseId, DeliverableId,
        FeedbackGiven, InstanceKind, ResultKey, StoreSnapshot, UserName,
    },
    ports::{ResultStore, ResultStoreError, ResultStoreResult, ensure_clear_permitted},
};

/// Thread-safe in-memory result store.
#[derive(Debug, Clone)]
pub struct InMemoryResultStore {
    instance: InstanceKind,
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    pushes: Vec<ContainerInput>,
    comments: Vec<CommentEvent>,
    outputs: Vec<CommitRecord>,
    output_index: HashMap<ResultKey, usize>,
    feedback: Vec<FeedbackGiven>,
}

impl InMemoryResultStore {
    /// Creates an empty store for the given instance kind.
    #[must_use]
    pub fn new(instance: InstanceKind) -> Self {
        Self {
            instance,
            state: Arc::new(RwLock::new(InMemoryStoreState::default())),
        }
    }

    /// Creates an empty store for a test instance.
    #[must_use]
    pub fn for_tests() -> Self {
        Self::new(InstanceKind::Test)
    }
}

fn lock_error(err: impl ToString) -> ResultStoreError {
    ResultStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn save_push(&self, input: &ContainerInput) -> ResultStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.pushes.push(input.clone());
        Ok(())
    }

    async fn get_push_record(
        &self,
        commit_url: &CommitUrl,
    ) -> ResultStoreResult<Option<ContainerInput>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .pushes
            .iter()
            .find(|push| push.push().commit_url() == commit_url)
            .cloned())
    }

    async fn save_comment(&self, event: &CommentEvent) -> ResultStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.comments.push(event.clone());
        Ok(())
    }

    async fn get_comment_record(
        &self,
        commit_url: &CommitUrl,
        deliv_id: &DeliverableId,
    ) -> ResultStoreResult<Option<CommentEvent>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .comments
            .iter()
            .find(|comment| {
                comment.commit_url() == commit_url && comment.deliv_id() == Some(deliv_id)
            })
            .cloned())
    }

    async fn save_output_record(&self, record: &CommitRecord) -> ResultStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let key = record.key();
        if state.output_index.contains_key(&key) {
            return Err(ResultStoreError::DuplicateOutputRecord(key));
        }
        let position = state.outputs.len();
        state.outputs.push(record.clone());
        state.output_index.insert(key, position);
        Ok(())
    }

    async fn get_output_record(
        &self,
        commit_url: &CommitUrl,
        deliv_id: &DeliverableId,
    ) -> ResultStoreResult<Option<CommitRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        let key = ResultKey::new(commit_url.clone(), deliv_id.clone());
        Ok(state
            .output_index
            .get(&key)
            .and_then(|position| state.outputs.get(*position))
            .cloned())
    }

    async fn save_feedback_given_record(&self, record: &FeedbackGiven) -> ResultStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.feedback.push(record.clone());
        Ok(())
    }

    async fn get_latest_feedback_given_record(
        &self,
        course_id: &CourseId,
        deliv_id: &DeliverableId,
        user_name: &UserName,
    ) -> ResultStoreResult<Option<FeedbackGiven>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .feedback
            .iter()
            .filter(|grant| grant.matches(course_id, deliv_id, user_name))
            .max_by_key(|grant| grant.timestamp())
            .cloned())
    }

    async fn get_feedback_given_record_for_commit(
        &self,
        commit_url: &CommitUrl,
        user_name: &UserName,
    ) -> ResultStoreResult<Option<FeedbackGiven>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .feedback
            .iter()
            .find(|grant| grant.commit_url() == commit_url && grant.user_name() == user_name)
            .cloned())
    }

    async fn get_feedback_given_records_for_commit(
        &self,
        commit_url: &CommitUrl,
        user_name: &UserName,
    ) -> ResultStoreResult<Vec<FeedbackGiven>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .feedback
            .iter()
            .filter(|grant| grant.commit_url() == commit_url && grant.user_name() == user_name)
            .cloned()
            .collect())
    }

    async fn get_all_data(&self) -> ResultStoreResult<StoreSnapshot> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(StoreSnapshot {
            records: state.outputs.clone(),
            comments: state.comments.clone(),
            pushes: state.pushes.clone(),
            feedback: state.feedback.clone(),
        })
    }

    async fn clear_data(&self) -> ResultStoreResult<()> {
        ensure_clear_permitted(self.instance)?;
        let mut state = self.state.write().map_err(lock_error)?;
        *state = InMemoryStoreState::default();
        tracing::warn!("in-memory result store cleared");
        Ok(())
    }
}
