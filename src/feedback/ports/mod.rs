//! Port contracts for feedback publishing.

pub mod publisher;

pub use publisher::{FeedbackPublisher, PublishError, PublishResult, PublishedMessage};
