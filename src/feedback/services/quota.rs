//! Cooldown check between feedback posts.

use crate::feedback::domain::{FeedbackPolicy, QuotaDecision};
use crate::results::{
    domain::{CourseId, DeliverableId, UserName},
    ports::{ResultStore, ResultStoreResult},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Decides whether a user may receive feedback for a deliverable.
///
/// Reads the latest grant from the store and never writes; recording a
/// grant is left to the caller once a post has succeeded.
#[derive(Clone)]
pub struct QuotaGuard {
    store: Arc<dyn ResultStore>,
    policy: FeedbackPolicy,
}

impl QuotaGuard {
    /// Creates a guard over `store` applying `policy`.
    #[must_use]
    pub const fn new(store: Arc<dyn ResultStore>, policy: FeedbackPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the policy in force.
    #[must_use]
    pub const fn policy(&self) -> &FeedbackPolicy {
        &self.policy
    }

    /// Checks the cooldown for the triple at `now`.
    ///
    /// A grant timestamped after `now` counts as zero elapsed time.
    ///
    /// # Errors
    ///
    /// Returns the store error when the latest grant cannot be read.
    pub async fn check_quota(
        &self,
        course_id: &CourseId,
        deliv_id: &DeliverableId,
        user_name: &UserName,
        now: DateTime<Utc>,
    ) -> ResultStoreResult<QuotaDecision> {
        let Some(latest) = self
            .store
            .get_latest_feedback_given_record(course_id, deliv_id, user_name)
            .await?
        else {
            return Ok(QuotaDecision::Allowed);
        };
        let interval = self.policy.interval_for(deliv_id);
        let elapsed = (now - latest.timestamp()).to_std().unwrap_or_default();
        if elapsed >= interval {
            return Ok(QuotaDecision::Allowed);
        }
        let retry_after = interval.saturating_sub(elapsed);
        tracing::debug!(
            user = %user_name,
            deliv_id = %deliv_id,
            retry_after_secs = retry_after.as_secs(),
            "feedback quota exhausted"
        );
        Ok(QuotaDecision::Denied { retry_after })
    }
}
