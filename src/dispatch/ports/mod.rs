//! Port contracts for job queues and deliverable resolution.

pub mod queue;
pub mod resolver;

pub use queue::{EnqueueReceipt, JobQueueError, JobQueueResult, TestJobQueue};
pub use resolver::DeliverableResolver;
