//! Feedback policy and request outcomes.

mod outcome;
mod policy;

pub use outcome::CommentOutcome;
pub use policy::{FeedbackPolicy, QuotaDecision};
