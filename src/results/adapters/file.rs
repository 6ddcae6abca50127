//! File-per-collection result store.
//!
//! Each collection is a JSON-lines file inside a capability-scoped directory.
//! Records are written with a single append of one complete line, so a write
//! never rewrites earlier records. Writers inside the process are serialized
//! by a lock; the output uniqueness check and its append happen under that
//! lock, which readers take too. A trailing line without its newline is an
//! interrupted append and is skipped. The store is not safe for several
//! processes sharing one directory.

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs_utf8::{Dir, OpenOptions};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::results::{
    domain::{
        CommentEvent, CommitRecord, CommitUrl, ContainerInput, CourseId, DeliverableId,
        FeedbackGiven, InstanceKind, StoreSnapshot, UserName,
    },
    ports::{ResultStore, ResultStoreError, ResultStoreResult, ensure_clear_permitted},
};

/// Logical collections and their backing files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Pushes,
    Comments,
    Outputs,
    Feedback,
}

impl Collection {
    const ALL: [Self; 4] = [Self::Pushes, Self::Comments, Self::Outputs, Self::Feedback];

    const fn file_name(self) -> &'static str {
        match self {
            Self::Pushes => "pushes.jsonl",
            Self::Comments => "comments.jsonl",
            Self::Outputs => "outputs.jsonl",
            Self::Feedback => "feedback.jsonl",
        }
    }
}

/// Result store persisting each collection to its own file.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    dir: Arc<Dir>,
    instance: InstanceKind,
    write_lock: Arc<Mutex<()>>,
}

impl FileResultStore {
    /// Opens (creating when missing) the store directory.
    ///
    /// # Errors
    ///
    /// Returns [`ResultStoreError::Persistence`] when the directory cannot be
    /// created or opened.
    pub fn open(path: &str, instance: InstanceKind) -> ResultStoreResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(ResultStoreError::persistence)?;
        let dir =
            Dir::open_ambient_dir(path, ambient_authority()).map_err(ResultStoreError::persistence)?;
        tracing::info!(path, instance = instance.as_str(), "file result store opened");
        Ok(Self {
            dir: Arc::new(dir),
            instance,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    async fn run_blocking<F, T>(&self, f: F) -> ResultStoreResult<T>
    where
        F: FnOnce(&Dir, &Mutex<()>) -> ResultStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        let write_lock = Arc::clone(&self.write_lock);
        tokio::task::spawn_blocking(move || f(&dir, &write_lock))
            .await
            .map_err(ResultStoreError::persistence)?
    }

    async fn read<T>(&self, collection: Collection) -> ResultStoreResult<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.run_blocking(move |dir, write_lock| {
            let _guard = write_lock.lock().map_err(lock_error)?;
            read_collection(dir, collection)
        })
        .await
    }

    async fn append<T>(&self, collection: Collection, record: &T) -> ResultStoreResult<()>
    where
        T: Serialize,
    {
        let line = encode_line(record)?;
        self.run_blocking(move |dir, write_lock| {
            let _guard = write_lock.lock().map_err(lock_error)?;
            append_line(dir, collection, &line)
        })
        .await
    }
}

fn lock_error(err: impl ToString) -> ResultStoreError {
    ResultStoreError::persistence(std::io::Error::other(err.to_string()))
}

fn encode_line<T: Serialize>(record: &T) -> ResultStoreResult<String> {
    let mut line = serde_json::to_string(record).map_err(ResultStoreError::persistence)?;
    line.push('\n');
    Ok(line)
}

fn read_collection<T: DeserializeOwned>(
    dir: &Dir,
    collection: Collection,
) -> ResultStoreResult<Vec<T>> {
    let name = collection.file_name();
    if !dir.exists(name) {
        return Ok(Vec::new());
    }
    let contents = dir
        .read_to_string(name)
        .map_err(ResultStoreError::persistence)?;
    let (complete, partial) = match contents.rfind('\n') {
        Some(end) => contents.split_at(end + 1),
        None => ("", contents.as_str()),
    };
    if !partial.trim().is_empty() {
        tracing::warn!(file = name, bytes = partial.len(), "ignoring unterminated trailing record");
    }
    complete
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(ResultStoreError::persistence))
        .collect()
}

fn append_line(dir: &Dir, collection: Collection, line: &str) -> ResultStoreResult<()> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    let mut file = dir
        .open_with(collection.file_name(), &options)
        .map_err(ResultStoreError::persistence)?;
    file.write_all(line.as_bytes())
        .map_err(ResultStoreError::persistence)?;
    file.sync_data().map_err(ResultStoreError::persistence)
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn save_push(&self, input: &ContainerInput) -> ResultStoreResult<()> {
        self.append(Collection::Pushes, input).await
    }

    async fn get_push_record(
        &self,
        commit_url: &CommitUrl,
    ) -> ResultStoreResult<Option<ContainerInput>> {
        let pushes: Vec<ContainerInput> = self.read(Collection::Pushes).await?;
        Ok(pushes
            .into_iter()
            .find(|push| push.push().commit_url() == commit_url))
    }

    async fn save_comment(&self, event: &CommentEvent) -> ResultStoreResult<()> {
        self.append(Collection::Comments, event).await
    }

    async fn get_comment_record(
        &self,
        commit_url: &CommitUrl,
        deliv_id: &DeliverableId,
    ) -> ResultStoreResult<Option<CommentEvent>> {
        let comments: Vec<CommentEvent> = self.read(Collection::Comments).await?;
        Ok(comments.into_iter().find(|comment| {
            comment.commit_url() == commit_url && comment.deliv_id() == Some(deliv_id)
        }))
    }

    async fn save_output_record(&self, record: &CommitRecord) -> ResultStoreResult<()> {
        let line = encode_line(record)?;
        let key = record.key();
        self.run_blocking(move |dir, write_lock| {
            let _guard = write_lock.lock().map_err(lock_error)?;
            let existing: Vec<CommitRecord> = read_collection(dir, Collection::Outputs)?;
            if existing.iter().any(|output| output.key() == key) {
                return Err(ResultStoreError::DuplicateOutputRecord(key));
            }
            append_line(dir, Collection::Outputs, &line)
        })
        .await
    }

    async fn get_output_record(
        &self,
        commit_url: &CommitUrl,
        deliv_id: &DeliverableId,
    ) -> ResultStoreResult<Option<CommitRecord>> {
        let outputs: Vec<CommitRecord> = self.read(Collection::Outputs).await?;
        Ok(outputs
            .into_iter()
            .find(|output| output.commit_url() == commit_url && output.deliv_id() == deliv_id))
    }

    async fn save_feedback_given_record(&self, record: &FeedbackGiven) -> ResultStoreResult<()> {
        self.append(Collection::Feedback, record).await
    }

    async fn get_latest_feedback_given_record(
        &self,
        course_id: &CourseId,
        deliv_id: &DeliverableId,
        user_name: &UserName,
    ) -> ResultStoreResult<Option<FeedbackGiven>> {
        let grants: Vec<FeedbackGiven> = self.read(Collection::Feedback).await?;
        Ok(grants
            .into_iter()
            .filter(|grant| grant.matches(course_id, deliv_id, user_name))
            .max_by_key(FeedbackGiven::timestamp))
    }

    async fn get_feedback_given_record_for_commit(
        &self,
        commit_url: &CommitUrl,
        user_name: &UserName,
    ) -> ResultStoreResult<Option<FeedbackGiven>> {
        let grants: Vec<FeedbackGiven> = self.read(Collection::Feedback).await?;
        Ok(grants
            .into_iter()
            .find(|grant| grant.commit_url() == commit_url && grant.user_name() == user_name))
    }

    async fn get_feedback_given_records_for_commit(
        &self,
        commit_url: &CommitUrl,
        user_name: &UserName,
    ) -> ResultStoreResult<Vec<FeedbackGiven>> {
        let grants: Vec<FeedbackGiven> = self.read(Collection::Feedback).await?;
        Ok(grants
            .into_iter()
            .filter(|grant| grant.commit_url() == commit_url && grant.user_name() == user_name)
            .collect())
    }

    async fn get_all_data(&self) -> ResultStoreResult<StoreSnapshot> {
        tracing::warn!("dumping file result store; debugging only");
        Ok(StoreSnapshot {
            records: self.read(Collection::Outputs).await?,
            comments: self.read(Collection::Comments).await?,
            pushes: self.read(Collection::Pushes).await?,
            feedback: self.read(Collection::Feedback).await?,
        })
    }

    async fn clear_data(&self) -> ResultStoreResult<()> {
        ensure_clear_permitted(self.instance)?;
        self.run_blocking(|dir, write_lock| {
            let _guard = write_lock.lock().map_err(lock_error)?;
            for collection in Collection::ALL {
                let name = collection.file_name();
                if dir.exists(name) {
                    dir.remove_file(name)
                        .map_err(ResultStoreError::persistence)?;
                }
            }
            Ok(())
        })
        .await?;
        tracing::warn!("file result store cleared");
        Ok(())
    }
}
