//! Adapter implementations of the dispatch ports.

pub mod configured_resolver;
pub mod memory_queue;

pub use configured_resolver::ConfiguredDeliverableResolver;
pub use memory_queue::{InMemoryJobQueue, QueuedJob};
