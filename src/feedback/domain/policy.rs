//! Cooldown policy between feedback posts.

use crate::config::{AutotestConfig, ConfigError};
use crate::results::domain::DeliverableId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Minimum interval between feedback posts, per deliverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackPolicy {
    default_interval: Duration,
    intervals: BTreeMap<DeliverableId, Duration>,
}

impl FeedbackPolicy {
    /// Creates a policy applying `default_interval` to every deliverable.
    #[must_use]
    pub const fn new(default_interval: Duration) -> Self {
        Self {
            default_interval,
            intervals: BTreeMap::new(),
        }
    }

    /// Overrides the interval for one deliverable.
    #[must_use]
    pub fn with_interval(mut self, deliv_id: DeliverableId, interval: Duration) -> Self {
        self.intervals.insert(deliv_id, interval);
        self
    }

    /// Builds the policy from runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] for malformed identifiers.
    pub fn from_config(config: &AutotestConfig) -> Result<Self, ConfigError> {
        let mut policy = Self::new(config.default_feedback_interval());
        for (deliv_id, settings) in config.deliverables_by_id()? {
            if let Some(secs) = settings.feedback_interval_secs {
                policy = policy.with_interval(deliv_id, Duration::from_secs(secs));
            }
        }
        Ok(policy)
    }

    /// Returns the interval applying to `deliv_id`.
    #[must_use]
    pub fn interval_for(&self, deliv_id: &DeliverableId) -> Duration {
        self.intervals
            .get(deliv_id)
            .copied()
            .unwrap_or(self.default_interval)
    }
}

/// Whether a user may receive feedback now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Feedback may be posted.
    Allowed,
    /// The cooldown has not elapsed.
    Denied {
        /// Time left until the next request is allowed.
        retry_after: Duration,
    },
}

impl QuotaDecision {
    /// Returns `true` for [`QuotaDecision::Allowed`].
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}
