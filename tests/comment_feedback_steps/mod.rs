//! Step definitions for commit feedback scenarios.

mod given;
mod then;
mod when;
pub mod world;
