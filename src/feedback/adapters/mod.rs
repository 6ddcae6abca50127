//! Adapter implementations of the publishing port.

pub mod github;
pub mod memory;

pub use github::GitHubPublisher;
pub use memory::InMemoryPublisher;
