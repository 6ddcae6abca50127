//! Commit test results and the records that gate feedback.
//!
//! The result store is the single source of truth for what was pushed,
//! which feedback requests were accepted, which commits have a finished
//! test output and which users have already received feedback. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - The storage port in [`ports`]
//! - Memory, file and `PostgreSQL` backends in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;
