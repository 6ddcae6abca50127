//! Publisher port: posts markdown to a commit.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for publishing operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Destination for feedback messages.
#[async_trait]
pub trait FeedbackPublisher: Send + Sync {
    /// Posts `body` as markdown to `target_url`.
    ///
    /// Input is validated before any network call. Succeeds only when the
    /// remote service acknowledges the post.
    async fn post_markdown(&self, target_url: &str, body: &str) -> PublishResult<()>;
}

/// Validated markdown message bound for a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedMessage {
    url: String,
    body: String,
}

impl PublishedMessage {
    /// Validates a message.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidTarget`] unless `target_url` is an
    /// absolute `http(s)` URL with a host, and [`PublishError::EmptyBody`]
    /// for a blank body.
    pub fn new(target_url: &str, body: &str) -> PublishResult<Self> {
        Self::parse_target(target_url)?;
        if body.trim().is_empty() {
            return Err(PublishError::EmptyBody);
        }
        Ok(Self {
            url: target_url.trim().to_owned(),
            body: body.to_owned(),
        })
    }

    /// Parses and checks a target URL.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidTarget`] for anything but an absolute
    /// `http(s)` URL with a host.
    pub fn parse_target(target_url: &str) -> PublishResult<Url> {
        let invalid = || PublishError::InvalidTarget(target_url.to_owned());
        let url = Url::parse(target_url.trim()).map_err(|_| invalid())?;
        let supported = matches!(url.scheme(), "http" | "https") && url.host_str().is_some();
        if supported { Ok(url) } else { Err(invalid()) }
    }

    /// Returns the target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the markdown body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Errors returned by publishers.
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    /// The target is not a usable URL.
    #[error("invalid publish target '{0}'")]
    InvalidTarget(String),

    /// The message body is blank.
    #[error("message body must not be empty")]
    EmptyBody,

    /// The remote service answered with a non-2xx status.
    #[error("post rejected with HTTP status {0}")]
    Rejected(u16),

    /// The request could not be sent or its response read.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl PublishError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
