//! Deliverable resolution port.

use crate::dispatch::domain::DeliveryTarget;
use crate::results::domain::{CourseId, DeliverableId, PushEvent};

/// Maps events to the deliverables they concern.
pub trait DeliverableResolver: Send + Sync {
    /// Returns the deliverables a push should be tested against.
    fn push_targets(&self, push: &PushEvent) -> Vec<DeliveryTarget>;

    /// Resolves the deliverable for a feedback request.
    ///
    /// A named deliverable must be known and open; without one the course
    /// default applies. Returns `None` when nothing resolves.
    fn resolve_comment(
        &self,
        course_id: &CourseId,
        requested: Option<&DeliverableId>,
    ) -> Option<DeliverableId>;
}
