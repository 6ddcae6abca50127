//! Identifier and validated scalar types for the results domain.

use super::ResultsDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trims a raw value and rejects empty or whitespace-containing tokens.
fn normalize_token(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return None;
    }
    Some(trimmed)
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    rest.is_some_and(|remainder| {
        let host = remainder.split('/').next().unwrap_or_default();
        !host.is_empty()
    })
}

/// Web URL of a commit; identifies the commit for result and feedback lookups.
///
/// Any fragment (such as the `#commitcomment-123` suffix carried by comment
/// URLs) is stripped so that pushes and comments on the same commit resolve
/// to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitUrl(String);

impl CommitUrl {
    /// Creates a validated commit URL.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsDomainError::InvalidCommitUrl`] when the value is not
    /// an absolute `http(s)` URL.
    pub fn new(value: impl Into<String>) -> Result<Self, ResultsDomainError> {
        let raw = value.into();
        let without_fragment = raw.split('#').next().unwrap_or_default();
        let Some(normalized) = normalize_token(without_fragment) else {
            return Err(ResultsDomainError::InvalidCommitUrl(raw));
        };
        if !is_http_url(normalized) {
            return Err(ResultsDomainError::InvalidCommitUrl(raw));
        }
        Ok(Self(normalized.trim_end_matches('/').to_owned()))
    }

    /// Returns the URL as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Web URL of the repository a commit belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectUrl(String);

impl ProjectUrl {
    /// Creates a validated project URL.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsDomainError::InvalidProjectUrl`] when the value is not
    /// an absolute `http(s)` URL.
    pub fn new(value: impl Into<String>) -> Result<Self, ResultsDomainError> {
        let raw = value.into();
        match normalize_token(&raw) {
            Some(normalized) if is_http_url(normalized) => {
                Ok(Self(normalized.trim_end_matches('/').to_owned()))
            }
            _ => Err(ResultsDomainError::InvalidProjectUrl(raw)),
        }
    }

    /// Returns the URL as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deliverable identifier such as `d1` or `project`.
///
/// Identifiers are case-insensitive and stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliverableId(String);

impl DeliverableId {
    /// Creates a validated deliverable identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsDomainError::InvalidDeliverableId`] when the value is
    /// empty or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ResultsDomainError> {
        let raw = value.into();
        normalize_token(&raw)
            .map(|token| Self(token.to_ascii_lowercase()))
            .ok_or(ResultsDomainError::InvalidDeliverableId(raw))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliverableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Course identifier such as `cs310`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    /// Creates a validated course identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsDomainError::InvalidCourseId`] when the value is empty
    /// or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ResultsDomainError> {
        let raw = value.into();
        normalize_token(&raw)
            .map(|token| Self(token.to_owned()))
            .ok_or(ResultsDomainError::InvalidCourseId(raw))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Login of the user who requested feedback; stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserName(String);

impl UserName {
    /// Creates a validated user name.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsDomainError::InvalidUserName`] when the value is empty
    /// or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ResultsDomainError> {
        let raw = value.into();
        normalize_token(&raw)
            .map(|token| Self(token.to_lowercase()))
            .ok_or(ResultsDomainError::InvalidUserName(raw))
    }

    /// Returns the user name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repository name as reported by the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Creates a validated repository name.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsDomainError::InvalidRepository`] when the value is
    /// empty or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ResultsDomainError> {
        let raw = value.into();
        normalize_token(&raw)
            .map(|token| Self(token.to_owned()))
            .ok_or(ResultsDomainError::InvalidRepository(raw))
    }

    /// Returns the repository name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hexadecimal commit hash (abbreviated or full).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitSha(String);

impl CommitSha {
    const MIN_LENGTH: usize = 7;
    const MAX_LENGTH: usize = 64;

    /// Creates a validated commit hash.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsDomainError::InvalidCommitSha`] when the value is not
    /// 7 to 64 hexadecimal characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ResultsDomainError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_lowercase();
        let is_valid = (Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&normalized.len())
            && normalized.chars().all(|ch| ch.is_ascii_hexdigit());
        if !is_valid {
            return Err(ResultsDomainError::InvalidCommitSha(raw));
        }
        Ok(Self(normalized))
    }

    /// Returns the hash as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
