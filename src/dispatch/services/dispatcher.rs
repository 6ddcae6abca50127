//! Test dispatcher: pushes in, de-duplicated jobs out.

use crate::dispatch::{
    domain::{DispatchOutcome, QueueDecision, RecordOutcome},
    ports::{DeliverableResolver, JobQueueError, TestJobQueue},
};
use crate::key_lock::{KeyGuard, KeyLocks};
use crate::results::{
    domain::{CommitRecord, ContainerInput, PushEvent, ResultKey},
    ports::{ResultStore, ResultStoreError},
};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Guard proving exclusive access to one `(commit, deliverable)` key.
pub type ResultKeyGuard = KeyGuard<ResultKey>;

/// Service-level errors for dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The result store failed.
    #[error(transparent)]
    Store(#[from] ResultStoreError),
    /// The job queue rejected the job.
    #[error(transparent)]
    Queue(#[from] JobQueueError),
    /// The caller held the lock for a different key.
    #[error("lock held for {held} but job is for {requested}")]
    LockMismatch {
        /// Key the guard protects.
        held: ResultKey,
        /// Key of the job.
        requested: ResultKey,
    },
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Turns pushes into queued test jobs, at most one per key.
///
/// Every check-then-act sequence runs while holding the key's lock, which is
/// shared with the comment orchestrator and its scheduled re-checks.
pub struct TestDispatcher<C>
where
    C: Clock + Send + Sync,
{
    store: Arc<dyn ResultStore>,
    queue: Arc<dyn TestJobQueue>,
    resolver: Arc<dyn DeliverableResolver>,
    clock: Arc<C>,
    locks: KeyLocks<ResultKey>,
    in_flight: Mutex<HashSet<ResultKey>>,
}

impl<C> TestDispatcher<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        store: Arc<dyn ResultStore>,
        queue: Arc<dyn TestJobQueue>,
        resolver: Arc<dyn DeliverableResolver>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            store,
            queue,
            resolver,
            clock,
            locks: KeyLocks::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the result store.
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Returns the deliverable resolver.
    #[must_use]
    pub const fn resolver(&self) -> &Arc<dyn DeliverableResolver> {
        &self.resolver
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock_key(&self, key: ResultKey) -> ResultKeyGuard {
        self.locks.lock(key).await
    }

    /// Returns `true` when a job for `key` is queued and unreported.
    #[must_use]
    pub fn is_in_flight(&self, key: &ResultKey) -> bool {
        self.in_flight().contains(key)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<ResultKey>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues tests for every deliverable the push targets.
    ///
    /// A key that already has a stored output, or whose job is still in
    /// flight, is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the store or queue fails. Keys handled
    /// before the failure keep their effects.
    pub async fn on_push(&self, event: PushEvent) -> DispatchResult<DispatchOutcome> {
        let targets = self.resolver.push_targets(&event);
        let mut outcome = DispatchOutcome::default();
        if targets.is_empty() {
            tracing::info!(commit_url = %event.commit_url(), "push targets no deliverable");
            return Ok(outcome);
        }
        for target in targets {
            let input = ContainerInput::new(
                event.clone(),
                target.course_id().clone(),
                target.deliv_id().clone(),
                &*self.clock,
            );
            let key = input.key();
            let guard = self.lock_key(key.clone()).await;
            let decision = self.queue_if_untested(input, &guard).await?;
            outcome.record(key, decision);
        }
        Ok(outcome)
    }

    /// Queues `input` unless its key is already tested or in flight.
    ///
    /// The push intent is stored before the job is enqueued.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::LockMismatch`] when `guard` protects another
    /// key, or a store or queue error.
    pub async fn queue_if_untested(
        &self,
        input: ContainerInput,
        guard: &ResultKeyGuard,
    ) -> DispatchResult<QueueDecision> {
        let key = input.key();
        if guard.key() != &key {
            return Err(DispatchError::LockMismatch {
                held: guard.key().clone(),
                requested: key,
            });
        }
        if self
            .store
            .get_output_record(key.commit_url(), key.deliv_id())
            .await?
            .is_some()
        {
            tracing::debug!(key = %key, "commit already tested; not queueing");
            return Ok(QueueDecision::AlreadyTested);
        }
        if self.is_in_flight(&key) {
            tracing::debug!(key = %key, "test already in flight; not queueing");
            return Ok(QueueDecision::InFlight);
        }

        self.store.save_push(&input).await?;
        let receipt = self.queue.enqueue(&input).await?;
        self.in_flight().insert(key.clone());
        tracing::info!(key = %key, job_id = %receipt.job_id(), "test queued");
        Ok(QueueDecision::Queued)
    }

    /// Forgets the in-flight job for the guarded key.
    ///
    /// Used when the runner never reported back, so a later request can queue
    /// the key again.
    pub fn abandon(&self, guard: &ResultKeyGuard) {
        if self.in_flight().remove(guard.key()) {
            tracing::warn!(key = %guard.key(), "in-flight test abandoned");
        }
    }

    /// Stores a finished test output reported by the runner.
    ///
    /// An existing output for the key is never replaced.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] when the store fails.
    pub async fn on_test_complete(&self, record: CommitRecord) -> DispatchResult<RecordOutcome> {
        let key = record.key();
        let _guard = self.lock_key(key.clone()).await;
        let outcome = match self.store.save_output_record(&record).await {
            Ok(()) => RecordOutcome::Stored,
            Err(ResultStoreError::DuplicateOutputRecord(_)) => {
                tracing::warn!(key = %key, "duplicate test output ignored");
                RecordOutcome::AlreadyRecorded
            }
            Err(err) => return Err(err.into()),
        };
        self.in_flight().remove(&key);
        tracing::info!(key = %key, status = record.output().status().as_str(), "test output recorded");
        Ok(outcome)
    }
}
