//! Fixtures for in-memory service tests.

use crate::test_helpers::course_config;
use autotest::app::AutoTest;
use autotest::config::AutotestConfig;
use rstest::fixture;

/// Configuration for course 310 on the in-memory backend.
#[fixture]
pub fn config() -> AutotestConfig {
    course_config()
}

/// Starts the service on the system clock.
pub async fn start(config: AutotestConfig) -> AutoTest {
    AutoTest::start(config).await.expect("service starts")
}

/// Returns the bodies of every recorded message.
pub fn bodies(app: &AutoTest) -> Vec<String> {
    app.published_messages()
        .iter()
        .map(|message| message.body().to_owned())
        .collect()
}
