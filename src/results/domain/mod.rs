//! Domain model for commit testing results.
//!
//! Holds the inbound events (pushes and feedback-request comments), the
//! records persisted by the result store, and the validated identifiers that
//! key them. Nothing here performs I/O.

mod error;
mod events;
mod ids;
mod records;

pub use error::{ParseInstanceKindError, ResultsDomainError};
pub use events::{CommentEvent, PushEvent, ResultKey};
pub use ids::{CommitSha, CommitUrl, CourseId, DeliverableId, ProjectUrl, RepositoryName, UserName};
pub use records::{
    CommitRecord, ContainerInput, FeedbackGiven, InstanceKind, StoreSnapshot, TestOutput,
    TestStatus,
};
