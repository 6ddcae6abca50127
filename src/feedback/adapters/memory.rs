//! Recording publisher for tests and dry runs.

use crate::feedback::ports::{FeedbackPublisher, PublishError, PublishResult, PublishedMessage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// Publisher that keeps every accepted message in memory.
///
/// Can be switched into a failing mode to simulate a remote rejection.
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    messages: RwLock<Vec<PublishedMessage>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryPublisher {
    /// Creates an empty publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When `failing` is set, every post is rejected with status 503.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns every accepted message in posting order.
    #[must_use]
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of valid posts attempted, accepted or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedbackPublisher for InMemoryPublisher {
    async fn post_markdown(&self, target_url: &str, body: &str) -> PublishResult<()> {
        let message = PublishedMessage::new(target_url, body)?;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Rejected(503));
        }
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }
}
