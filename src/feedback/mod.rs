//! Rate-limited feedback on commits.
//!
//! Turns feedback-request comments into an immediate post, a deferred wait
//! for a test result, or a quota denial. The module follows hexagonal
//! architecture:
//!
//! - Policy and outcome types in [`domain`]
//! - The publishing contract in [`ports`]
//! - GitHub and in-memory publishers in [`adapters`]
//! - Quota guard, formatter and comment orchestrator in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
