//! Deliverable resolution backed by static configuration.

use crate::config::{AutotestConfig, ConfigError};
use crate::dispatch::{domain::DeliveryTarget, ports::DeliverableResolver};
use crate::results::domain::{CourseId, DeliverableId, PushEvent};
use std::collections::BTreeMap;

/// Resolves deliverables for a single course from configuration.
///
/// Pushes are tested against the default deliverable. Feedback requests may
/// name any open deliverable of the course.
#[derive(Debug, Clone)]
pub struct ConfiguredDeliverableResolver {
    course_id: CourseId,
    default_deliverable: Option<DeliverableId>,
    open: BTreeMap<DeliverableId, bool>,
}

impl ConfiguredDeliverableResolver {
    /// Creates a resolver for `course_id` with no deliverables.
    #[must_use]
    pub const fn new(course_id: CourseId) -> Self {
        Self {
            course_id,
            default_deliverable: None,
            open: BTreeMap::new(),
        }
    }

    /// Adds a deliverable.
    #[must_use]
    pub fn with_deliverable(mut self, deliv_id: DeliverableId, open: bool) -> Self {
        self.open.insert(deliv_id, open);
        self
    }

    /// Sets the default deliverable.
    #[must_use]
    pub fn with_default(mut self, deliv_id: DeliverableId) -> Self {
        self.open.entry(deliv_id.clone()).or_insert(true);
        self.default_deliverable = Some(deliv_id);
        self
    }

    /// Builds a resolver from runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] for malformed identifiers.
    pub fn from_config(config: &AutotestConfig) -> Result<Self, ConfigError> {
        let mut resolver = Self::new(config.course()?);
        for (deliv_id, settings) in config.deliverables_by_id()? {
            resolver = resolver.with_deliverable(deliv_id, settings.open);
        }
        if let Some(default) = config.default_deliverable_id()? {
            resolver.default_deliverable = Some(default);
        }
        Ok(resolver)
    }

    fn is_open(&self, deliv_id: &DeliverableId) -> bool {
        self.open.get(deliv_id).copied().unwrap_or(false)
    }
}

impl DeliverableResolver for ConfiguredDeliverableResolver {
    fn push_targets(&self, _push: &PushEvent) -> Vec<DeliveryTarget> {
        self.default_deliverable
            .iter()
            .filter(|deliv_id| self.is_open(deliv_id))
            .map(|deliv_id| DeliveryTarget::new(self.course_id.clone(), deliv_id.clone()))
            .collect()
    }

    fn resolve_comment(
        &self,
        course_id: &CourseId,
        requested: Option<&DeliverableId>,
    ) -> Option<DeliverableId> {
        if course_id != &self.course_id {
            return None;
        }
        let candidate = requested.or(self.default_deliverable.as_ref())?;
        self.is_open(candidate).then(|| candidate.clone())
    }
}
