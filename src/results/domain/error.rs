//! Error types for results domain validation.

use thiserror::Error;

/// Errors returned while constructing results domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResultsDomainError {
    /// The commit URL is not an absolute `http(s)` URL.
    #[error("invalid commit URL '{0}'")]
    InvalidCommitUrl(String),

    /// The project URL is not an absolute `http(s)` URL.
    #[error("invalid project URL '{0}'")]
    InvalidProjectUrl(String),

    /// The deliverable identifier is empty or malformed.
    #[error("invalid deliverable identifier '{0}'")]
    InvalidDeliverableId(String),

    /// The course identifier is empty or malformed.
    #[error("invalid course identifier '{0}'")]
    InvalidCourseId(String),

    /// The user name is empty or malformed.
    #[error("invalid user name '{0}'")]
    InvalidUserName(String),

    /// The repository name is empty or malformed.
    #[error("invalid repository name '{0}'")]
    InvalidRepository(String),

    /// The commit hash is not hexadecimal or has an unexpected length.
    #[error("invalid commit hash '{0}'")]
    InvalidCommitSha(String),

    /// The branch name is empty.
    #[error("branch name must not be empty")]
    EmptyBranch,

    /// A test score is outside the `0..=100` range.
    #[error("score {0} is outside 0..=100")]
    ScoreOutOfRange(u8),
}

/// Error returned while parsing an instance kind from configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown instance kind: {0}")]
pub struct ParseInstanceKindError(pub String);
