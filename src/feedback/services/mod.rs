//! Feedback services.

pub mod formatter;
pub mod orchestrator;
pub mod quota;

pub use formatter::{FeedbackFormatter, FormatError};
pub use orchestrator::{CommentError, CommentOrchestrator, CommentResult, RecheckSettings};
pub use quota::QuotaGuard;
