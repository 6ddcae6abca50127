//! In-memory job queue.
//!
//! Jobs stay in the queue until a consumer calls [`InMemoryJobQueue::take`]
//! or [`InMemoryJobQueue::drain`]. Nothing survives the process.

use crate::dispatch::ports::{EnqueueReceipt, JobQueueError, JobQueueResult, TestJobQueue};
use crate::results::domain::ContainerInput;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

/// Job accepted by the in-memory queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    receipt: EnqueueReceipt,
    job: ContainerInput,
}

impl QueuedJob {
    /// Returns the receipt issued on enqueue.
    #[must_use]
    pub const fn receipt(&self) -> &EnqueueReceipt {
        &self.receipt
    }

    /// Returns the job specification.
    #[must_use]
    pub const fn job(&self) -> &ContainerInput {
        &self.job
    }
}

/// Thread-safe FIFO queue with an optional capacity.
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    jobs: RwLock<VecDeque<QueuedJob>>,
    capacity: Option<usize>,
}

fn poison_err<T>(_: PoisonError<T>) -> JobQueueError {
    JobQueueError::unavailable(std::io::Error::other("job queue lock poisoned"))
}

impl InMemoryJobQueue {
    /// Creates an unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue that rejects jobs beyond `capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    /// Removes and returns the oldest job.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Unavailable`] if the lock is poisoned.
    pub fn take(&self) -> JobQueueResult<Option<QueuedJob>> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        Ok(jobs.pop_front())
    }

    /// Removes and returns every job in FIFO order.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Unavailable`] if the lock is poisoned.
    pub fn drain(&self) -> JobQueueResult<Vec<QueuedJob>> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        Ok(jobs.drain(..).collect())
    }

    /// Returns the number of waiting jobs.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Unavailable`] if the lock is poisoned.
    pub fn len(&self) -> JobQueueResult<usize> {
        Ok(self.jobs.read().map_err(poison_err)?.len())
    }

    /// Returns `true` when no job is waiting.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Unavailable`] if the lock is poisoned.
    pub fn is_empty(&self) -> JobQueueResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl TestJobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: &ContainerInput) -> JobQueueResult<EnqueueReceipt> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        if let Some(capacity) = self.capacity
            && jobs.len() >= capacity
        {
            return Err(JobQueueError::Full(capacity));
        }
        let receipt = EnqueueReceipt::new(uuid::Uuid::new_v4());
        jobs.push_back(QueuedJob {
            receipt: receipt.clone(),
            job: job.clone(),
        });
        drop(jobs);
        tracing::debug!(
            job_id = %receipt.job_id(),
            commit_url = %job.push().commit_url(),
            deliv_id = %job.deliv_id(),
            "test job enqueued"
        );
        Ok(receipt)
    }
}
