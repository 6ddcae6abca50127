//! Queue port feeding the external test runner.

use crate::results::domain::ContainerInput;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for job queue operations.
pub type JobQueueResult<T> = Result<T, JobQueueError>;

/// Receipt returned for an accepted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueReceipt {
    job_id: uuid::Uuid,
}

impl EnqueueReceipt {
    /// Creates a receipt for `job_id`.
    #[must_use]
    pub const fn new(job_id: uuid::Uuid) -> Self {
        Self { job_id }
    }

    /// Returns the queue-assigned job identifier.
    #[must_use]
    pub const fn job_id(&self) -> uuid::Uuid {
        self.job_id
    }
}

/// Destination for test jobs.
#[async_trait]
pub trait TestJobQueue: Send + Sync {
    /// Enqueues a job for the test runner.
    async fn enqueue(&self, job: &ContainerInput) -> JobQueueResult<EnqueueReceipt>;
}

/// Errors returned by job queue implementations.
#[derive(Debug, Clone, Error)]
pub enum JobQueueError {
    /// The queue holds its maximum number of jobs.
    #[error("job queue is full (capacity {0})")]
    Full(usize),

    /// The queue backend failed.
    #[error("job queue unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl JobQueueError {
    /// Wraps a backend error.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
