//! Markdown bodies for feedback, denial, timeout and usage notices.

use crate::results::domain::{CommitRecord, CourseId, DeliverableId, UserName};
use minijinja::{Environment, context};
use std::time::Duration;
use thiserror::Error;

const FEEDBACK_TEMPLATE: &str = "\
### Autotest feedback for `{{ deliv }}`

@{{ user }}, here are the results for this commit.

**Status:** {{ status }}
{%- if score is not none %}
**Score:** {{ score }}%
{%- endif %}

{{ feedback }}";

const DENIAL_TEMPLATE: &str = "\
@{{ user }}, feedback for `{{ deliv }}` was already given recently. \
You can request it again in {{ wait }}.";

const TIMEOUT_TEMPLATE: &str = "\
@{{ user }}, testing this commit for `{{ deliv }}` did not complete in time. \
Please request feedback again later.";

const USAGE_TEMPLATE: &str = "\
@{{ user }}, {% if requested %}`{{ requested }}` is not an open deliverable \
for course {{ course }}{% else %}no deliverable was named and course {{ course }} \
has no default{% endif %}. Mention an open deliverable to request feedback.";

/// Template rendering failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to render {template} template: {reason}")]
pub struct FormatError {
    template: &'static str,
    reason: String,
}

/// Renders the markdown posted on commits.
#[derive(Debug)]
pub struct FeedbackFormatter {
    environment: Environment<'static>,
}

impl FeedbackFormatter {
    /// Creates a formatter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            environment: Environment::new(),
        }
    }

    /// Renders the stored test output for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when rendering fails.
    pub fn feedback(&self, user: &UserName, record: &CommitRecord) -> Result<String, FormatError> {
        let output = record.output();
        self.render(
            "feedback",
            FEEDBACK_TEMPLATE,
            context! {
                user => user.as_str(),
                deliv => record.deliv_id().as_str(),
                status => output.status().as_str(),
                score => output.score(),
                feedback => output.feedback(),
            },
        )
    }

    /// Renders a quota denial.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when rendering fails.
    pub fn denial(
        &self,
        user: &UserName,
        deliv_id: &DeliverableId,
        retry_after: Duration,
    ) -> Result<String, FormatError> {
        self.render(
            "denial",
            DENIAL_TEMPLATE,
            context! {
                user => user.as_str(),
                deliv => deliv_id.as_str(),
                wait => humanize(retry_after),
            },
        )
    }

    /// Renders the notice posted when a result never arrived.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when rendering fails.
    pub fn timeout(&self, user: &UserName, deliv_id: &DeliverableId) -> Result<String, FormatError> {
        self.render(
            "timeout",
            TIMEOUT_TEMPLATE,
            context! { user => user.as_str(), deliv => deliv_id.as_str() },
        )
    }

    /// Renders the notice for a request naming no usable deliverable.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when rendering fails.
    pub fn usage(
        &self,
        user: &UserName,
        course_id: &CourseId,
        requested: Option<&DeliverableId>,
    ) -> Result<String, FormatError> {
        self.render(
            "usage",
            USAGE_TEMPLATE,
            context! {
                user => user.as_str(),
                course => course_id.as_str(),
                requested => requested.map(DeliverableId::as_str),
            },
        )
    }

    fn render(
        &self,
        template: &'static str,
        source: &str,
        ctx: minijinja::Value,
    ) -> Result<String, FormatError> {
        self.environment
            .render_str(source, ctx)
            .map_err(|error| FormatError {
                template,
                reason: error.to_string(),
            })
    }
}

impl Default for FeedbackFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a wait as hours, minutes and seconds, rounding up to the second.
#[must_use]
pub fn humanize(wait: Duration) -> String {
    let mut total = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        total += 1;
    }
    let hours = total.div_euclid(3600);
    let minutes = total.rem_euclid(3600).div_euclid(60);
    let seconds = total.rem_euclid(60);
    let parts: Vec<String> = [(hours, "h"), (minutes, "m"), (seconds, "s")]
        .into_iter()
        .filter(|(amount, _)| *amount > 0)
        .map(|(amount, unit)| format!("{amount}{unit}"))
        .collect();
    if parts.is_empty() {
        "0s".to_owned()
    } else {
        parts.join(" ")
    }
}
