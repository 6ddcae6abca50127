//! Push-triggered test dispatch.
//!
//! Turns push events into queued test jobs, at most one per commit and
//! deliverable, and records finished test outputs handed back by the runner.
//! The module follows hexagonal architecture:
//!
//! - Outcome types in [`domain`]
//! - Queue and deliverable resolution contracts in [`ports`]
//! - In-memory queue and configuration-backed resolver in [`adapters`]
//! - The [`services::TestDispatcher`] orchestration service

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
