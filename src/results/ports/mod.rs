//! Port contracts for result persistence.

pub mod store;

pub use store::{ResultStore, ResultStoreError, ResultStoreResult, ensure_clear_permitted};
