//! Result of handling one feedback request.

use crate::scheduler::TaskName;
use std::time::Duration;

/// What a feedback request led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    /// Feedback was published.
    Posted {
        /// Whether the post consumed quota. Re-requests for a commit the user
        /// already received feedback on are free.
        charged: bool,
    },
    /// No result exists yet; a re-check is scheduled.
    Deferred {
        /// Name of the scheduled re-check.
        task: TaskName,
    },
    /// The user's cooldown has not elapsed.
    Denied {
        /// Time left until the next request is allowed.
        retry_after: Duration,
    },
}
