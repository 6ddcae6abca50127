//! Diesel schema for result persistence.

diesel::table! {
    /// Append-only log of every stored document.
    autotest_documents (id) {
        /// Document identifier.
        id -> Uuid,
        /// Insertion order.
        seq -> Int8,
        /// Collection name (pushes, comments, outputs or feedback).
        #[max_length = 20]
        collection -> Varchar,
        /// Commit URL the document refers to.
        commit_url -> Text,
        /// Deliverable, when the document names one.
        #[max_length = 100]
        deliv_id -> Nullable<Varchar>,
        /// Course, when the document names one.
        #[max_length = 100]
        course_id -> Nullable<Varchar>,
        /// Requesting or receiving user, when known.
        #[max_length = 100]
        user_name -> Nullable<Varchar>,
        /// Serialized document.
        body -> Jsonb,
        /// Event time of the document.
        recorded_at -> Timestamptz,
    }
}
