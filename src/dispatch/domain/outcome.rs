//! Value types describing what a dispatch did.

use crate::results::domain::{CourseId, DeliverableId, ResultKey};

/// A course deliverable a commit should be tested against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryTarget {
    course_id: CourseId,
    deliv_id: DeliverableId,
}

impl DeliveryTarget {
    /// Creates a target.
    #[must_use]
    pub const fn new(course_id: CourseId, deliv_id: DeliverableId) -> Self {
        Self {
            course_id,
            deliv_id,
        }
    }

    /// Returns the course.
    #[must_use]
    pub const fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    /// Returns the deliverable.
    #[must_use]
    pub const fn deliv_id(&self) -> &DeliverableId {
        &self.deliv_id
    }
}

/// What happened to one `(commit, deliverable)` key during dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueDecision {
    /// Push intent stored and job enqueued.
    Queued,
    /// A test output already exists; nothing was queued.
    AlreadyTested,
    /// A job for the key is queued and has not reported back.
    InFlight,
}

impl QueueDecision {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::AlreadyTested => "already_tested",
            Self::InFlight => "in_flight",
        }
    }
}

/// Per-target decisions for one push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    decisions: Vec<(ResultKey, QueueDecision)>,
}

impl DispatchOutcome {
    pub(crate) fn record(&mut self, key: ResultKey, decision: QueueDecision) {
        self.decisions.push((key, decision));
    }

    /// Returns every key and its decision, in target order.
    #[must_use]
    pub fn decisions(&self) -> &[(ResultKey, QueueDecision)] {
        &self.decisions
    }

    /// Returns the number of jobs enqueued.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|(_, decision)| *decision == QueueDecision::Queued)
            .count()
    }

    /// Returns `true` when the push enqueued nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.queued_count() == 0
    }
}

/// Result of handing a finished test output to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The output was stored.
    Stored,
    /// An output for the key already existed and was kept.
    AlreadyRecorded,
}
