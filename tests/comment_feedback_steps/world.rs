//! Shared world state for commit feedback BDD scenarios.

use autotest::app::AutoTest;
use autotest::feedback::{domain::CommentOutcome, services::CommentError};
use rstest::fixture;

/// Scenario world for feedback behaviour tests.
#[derive(Default)]
pub struct FeedbackWorld {
    pub app: Option<AutoTest>,
    pub last_outcome: Option<Result<CommentOutcome, CommentError>>,
}

impl FeedbackWorld {
    /// Returns the running service.
    ///
    /// # Errors
    ///
    /// Returns an error when no course has been set up yet.
    pub fn app(&self) -> Result<&AutoTest, eyre::Report> {
        self.app
            .as_ref()
            .ok_or_else(|| eyre::eyre!("service not started in scenario world"))
    }

    /// Returns the outcome of the most recent request.
    ///
    /// # Errors
    ///
    /// Returns an error when no request has been made.
    pub fn last_outcome(&self) -> Result<&Result<CommentOutcome, CommentError>, eyre::Report> {
        self.last_outcome
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no feedback request made in scenario world"))
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> FeedbackWorld {
    FeedbackWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
