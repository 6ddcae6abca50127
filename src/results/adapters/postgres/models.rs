//! Diesel row models for result persistence.

use super::schema::autotest_documents;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for stored documents.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = autotest_documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DocumentRow {
    /// Collection the document belongs to.
    pub collection: String,
    /// Serialized document.
    pub body: Value,
}

/// Insert model for stored documents.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = autotest_documents)]
pub struct NewDocumentRow {
    /// Document identifier.
    pub id: uuid::Uuid,
    /// Collection the document belongs to.
    pub collection: String,
    /// Commit URL the document refers to.
    pub commit_url: String,
    /// Deliverable, when present.
    pub deliv_id: Option<String>,
    /// Course, when present.
    pub course_id: Option<String>,
    /// User, when present.
    pub user_name: Option<String>,
    /// Serialized document.
    pub body: Value,
    /// Event time of the document.
    pub recorded_at: DateTime<Utc>,
}
