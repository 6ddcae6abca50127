//! `PostgreSQL` result store.

use super::{
    models::{DocumentRow, NewDocumentRow},
    schema::autotest_documents,
};
use crate::results::{
    domain::{
        CommentEvent, CommitRecord, CommitUrl, ContainerInput, CourseId, DeliverableId,
        FeedbackGiven, InstanceKind, StoreSnapshot, UserName,
    },
    ports::{ResultStore, ResultStoreError, ResultStoreResult, ensure_clear_permitted},
};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// `PostgreSQL` connection pool type used by the result store.
pub type ResultPgPool = Pool<ConnectionManager<PgConnection>>;

const SCHEMA_SQL: &str =
    include_str!("../../../../migrations/2026-10-01-000000_create_autotest_documents/up.sql");

const PUSHES: &str = "pushes";
const COMMENTS: &str = "comments";
const OUTPUTS: &str = "outputs";
const FEEDBACK: &str = "feedback";

/// `PostgreSQL`-backed result store.
///
/// Every record is one row of an append-only document table. Output
/// uniqueness is enforced by a partial unique index, so concurrent writers
/// across processes still store at most one output per key.
#[derive(Debug, Clone)]
pub struct PostgresResultStore {
    pool: ResultPgPool,
    instance: InstanceKind,
}

impl PostgresResultStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ResultPgPool, instance: InstanceKind) -> Self {
        Self { pool, instance }
    }

    /// Builds a pool for `url` and wraps it in a store.
    ///
    /// # Errors
    ///
    /// Returns [`ResultStoreError::Persistence`] if the pool cannot be built.
    pub fn connect(url: &str, pool_size: u32, instance: InstanceKind) -> ResultStoreResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(url);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(ResultStoreError::persistence)?;
        Ok(Self::new(pool, instance))
    }

    /// Creates the document table and its indexes when missing.
    ///
    /// # Errors
    ///
    /// Returns [`ResultStoreError::Persistence`] if the DDL fails.
    pub async fn ensure_schema(&self) -> ResultStoreResult<()> {
        self.run_blocking(|connection| {
            connection
                .batch_execute(SCHEMA_SQL)
                .map_err(ResultStoreError::persistence)
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> ResultStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ResultStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ResultStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ResultStoreError::persistence)?
    }

    async fn insert(&self, row: NewDocumentRow) -> ResultStoreResult<()> {
        self.run_blocking(move |connection| {
            diesel::insert_into(autotest_documents::table)
                .values(&row)
                .execute(connection)
                .map_err(ResultStoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn first_body<T>(
        &self,
        collection: &'static str,
        commit_url: &CommitUrl,
        deliv_id: Option<&DeliverableId>,
    ) -> ResultStoreResult<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = commit_url.as_str().to_owned();
        let deliv = deliv_id.map(|id| id.as_str().to_owned());
        self.run_blocking(move |connection| {
            let mut query = autotest_documents::table
                .filter(autotest_documents::collection.eq(collection))
                .filter(autotest_documents::commit_url.eq(url))
                .into_boxed();
            if let Some(deliv_val) = deliv {
                query = query.filter(autotest_documents::deliv_id.eq(deliv_val));
            }
            let row = query
                .order(autotest_documents::seq.asc())
                .select(DocumentRow::as_select())
                .first::<DocumentRow>(connection)
                .optional()
                .map_err(ResultStoreError::persistence)?;
            row.map(decode_body).transpose()
        })
        .await
    }
}

fn encode_body<T: Serialize>(record: &T) -> ResultStoreResult<serde_json::Value> {
    serde_json::to_value(record).map_err(ResultStoreError::persistence)
}

fn decode_body<T: DeserializeOwned>(row: DocumentRow) -> ResultStoreResult<T> {
    serde_json::from_value(row.body).map_err(ResultStoreError::persistence)
}

fn push_row(input: &ContainerInput) -> ResultStoreResult<NewDocumentRow> {
    Ok(NewDocumentRow {
        id: uuid::Uuid::new_v4(),
        collection: PUSHES.to_owned(),
        commit_url: input.push().commit_url().as_str().to_owned(),
        deliv_id: Some(input.deliv_id().as_str().to_owned()),
        course_id: Some(input.course_id().as_str().to_owned()),
        user_name: input.requested_by().map(|user| user.as_str().to_owned()),
        body: encode_body(input)?,
        recorded_at: input.enqueued_at(),
    })
}

fn comment_row(event: &CommentEvent) -> ResultStoreResult<NewDocumentRow> {
    Ok(NewDocumentRow {
        id: uuid::Uuid::new_v4(),
        collection: COMMENTS.to_owned(),
        commit_url: event.commit_url().as_str().to_owned(),
        deliv_id: event.deliv_id().map(|id| id.as_str().to_owned()),
        course_id: Some(event.course_id().as_str().to_owned()),
        user_name: Some(event.user_name().as_str().to_owned()),
        body: encode_body(event)?,
        recorded_at: event.timestamp(),
    })
}

fn output_row(record: &CommitRecord) -> ResultStoreResult<NewDocumentRow> {
    Ok(NewDocumentRow {
        id: uuid::Uuid::new_v4(),
        collection: OUTPUTS.to_owned(),
        commit_url: record.commit_url().as_str().to_owned(),
        deliv_id: Some(record.deliv_id().as_str().to_owned()),
        course_id: None,
        user_name: None,
        body: encode_body(record)?,
        recorded_at: record.produced_at(),
    })
}

fn feedback_row(record: &FeedbackGiven) -> ResultStoreResult<NewDocumentRow> {
    Ok(NewDocumentRow {
        id: uuid::Uuid::new_v4(),
        collection: FEEDBACK.to_owned(),
        commit_url: record.commit_url().as_str().to_owned(),
        deliv_id: Some(record.deliv_id().as_str().to_owned()),
        course_id: Some(record.course_id().as_str().to_owned()),
        user_name: Some(record.user_name().as_str().to_owned()),
        body: encode_body(record)?,
        recorded_at: record.timestamp(),
    })
}

#[async_trait]
impl ResultStore for PostgresResultStore {
    async fn save_push(&self, input: &ContainerInput) -> ResultStoreResult<()> {
        self.insert(push_row(input)?).await
    }

    async fn get_push_record(
        &self,
        commit_url: &CommitUrl,
    ) -> ResultStoreResult<Option<ContainerInput>> {
        self.first_body(PUSHES, commit_url, None).await
    }

    async fn save_comment(&self, event: &CommentEvent) -> ResultStoreResult<()> {
        self.insert(comment_row(event)?).await
    }

    async fn get_comment_record(
        &self,
        commit_url: &CommitUrl,
        deliv_id: &DeliverableId,
    ) -> ResultStoreResult<Option<CommentEvent>> {
        self.first_body(COMMENTS, commit_url, Some(deliv_id)).await
    }

    async fn save_output_record(&self, record: &CommitRecord) -> ResultStoreResult<()> {
        let row = output_row(record)?;
        let key = record.key();
        self.run_blocking(move |connection| {
            diesel::insert_into(autotest_documents::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        ResultStoreError::DuplicateOutputRecord(key.clone())
                    }
                    _ => ResultStoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn get_output_record(
        &self,
        commit_url: &CommitUrl,
        deliv_id: &DeliverableId,
    ) -> ResultStoreResult<Option<CommitRecord>> {
        self.first_body(OUTPUTS, commit_url, Some(deliv_id)).await
    }

    async fn save_feedback_given_record(&self, record: &FeedbackGiven) -> ResultStoreResult<()> {
        self.insert(feedback_row(record)?).await
    }

    async fn get_latest_feedback_given_record(
        &self,
        course_id: &CourseId,
        deliv_id: &DeliverableId,
        user_name: &UserName,
    ) -> ResultStoreResult<Option<FeedbackGiven>> {
        let course_val = course_id.as_str().to_owned();
        let deliv_val = deliv_id.as_str().to_owned();
        let user_val = user_name.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = autotest_documents::table
                .filter(autotest_documents::collection.eq(FEEDBACK))
                .filter(autotest_documents::course_id.eq(course_val))
                .filter(autotest_documents::deliv_id.eq(deliv_val))
                .filter(autotest_documents::user_name.eq(user_val))
                .order((
                    autotest_documents::recorded_at.desc(),
                    autotest_documents::seq.desc(),
                ))
                .select(DocumentRow::as_select())
                .first::<DocumentRow>(connection)
                .optional()
                .map_err(ResultStoreError::persistence)?;
            row.map(decode_body).transpose()
        })
        .await
    }

    async fn get_feedback_given_record_for_commit(
        &self,
        commit_url: &CommitUrl,
        user_name: &UserName,
    ) -> ResultStoreResult<Option<FeedbackGiven>> {
        let url = commit_url.as_str().to_owned();
        let user_val = user_name.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = autotest_documents::table
                .filter(autotest_documents::collection.eq(FEEDBACK))
                .filter(autotest_documents::commit_url.eq(url))
                .filter(autotest_documents::user_name.eq(user_val))
                .order(autotest_documents::seq.asc())
                .select(DocumentRow::as_select())
                .first::<DocumentRow>(connection)
                .optional()
                .map_err(ResultStoreError::persistence)?;
            row.map(decode_body).transpose()
        })
        .await
    }

    async fn get_feedback_given_records_for_commit(
        &self,
        commit_url: &CommitUrl,
        user_name: &UserName,
    ) -> ResultStoreResult<Vec<FeedbackGiven>> {
        let url = commit_url.as_str().to_owned();
        let user_val = user_name.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = autotest_documents::table
                .filter(autotest_documents::collection.eq(FEEDBACK))
                .filter(autotest_documents::commit_url.eq(url))
                .filter(autotest_documents::user_name.eq(user_val))
                .order(autotest_documents::seq.asc())
                .select(DocumentRow::as_select())
                .load::<DocumentRow>(connection)
                .map_err(ResultStoreError::persistence)?;
            rows.into_iter().map(decode_body).collect()
        })
        .await
    }

    async fn get_all_data(&self) -> ResultStoreResult<StoreSnapshot> {
        tracing::warn!("dumping postgres result store; debugging only");
        self.run_blocking(|connection| {
            let rows = autotest_documents::table
                .order(autotest_documents::seq.asc())
                .select(DocumentRow::as_select())
                .load::<DocumentRow>(connection)
                .map_err(ResultStoreError::persistence)?;
            let mut snapshot = StoreSnapshot::default();
            for row in rows {
                let collection = row.collection.clone();
                match collection.as_str() {
                    PUSHES => snapshot.pushes.push(decode_body(row)?),
                    COMMENTS => snapshot.comments.push(decode_body(row)?),
                    OUTPUTS => snapshot.records.push(decode_body(row)?),
                    FEEDBACK => snapshot.feedback.push(decode_body(row)?),
                    other => tracing::warn!(collection = other, "skipping unknown collection"),
                }
            }
            Ok(snapshot)
        })
        .await
    }

    async fn clear_data(&self) -> ResultStoreResult<()> {
        ensure_clear_permitted(self.instance)?;
        self.run_blocking(|connection| {
            diesel::delete(autotest_documents::table)
                .execute(connection)
                .map_err(ResultStoreError::persistence)?;
            Ok(())
        })
        .await?;
        tracing::warn!("postgres result store cleared");
        Ok(())
    }
}
