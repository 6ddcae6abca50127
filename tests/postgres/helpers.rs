//! Shared test helpers for `PostgreSQL` integration tests.

use autotest::results::{adapters::PostgresResultStore, domain::InstanceKind};
use std::env;
use tokio::sync::OnceCell;

/// Environment variable naming the test database.
pub const DATABASE_URL_ENV: &str = "AUTOTEST_TEST_DATABASE_URL";

static SCHEMA: OnceCell<()> = OnceCell::const_new();

/// Connects to the test database and creates the schema once per run, or
/// returns `None` when no database is configured.
pub async fn connect(instance: InstanceKind) -> Option<PostgresResultStore> {
    let url = env::var(DATABASE_URL_ENV).ok()?;
    let store = PostgresResultStore::connect(&url, 2, instance).expect("connect to test database");
    SCHEMA
        .get_or_try_init(|| store.ensure_schema())
        .await
        .expect("create schema");
    Some(store)
}

/// Returns a commit hash not used by any earlier test run.
pub fn fresh_sha() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
