//! Comment orchestrator: feedback requests in, posts and re-checks out.

use crate::config::AutotestConfig;
use crate::dispatch::services::{DispatchError, TestDispatcher};
use crate::feedback::{
    domain::{CommentOutcome, QuotaDecision},
    ports::{FeedbackPublisher, PublishError},
    services::{FeedbackFormatter, FormatError, QuotaGuard},
};
use crate::key_lock::KeyLocks;
use crate::results::{
    domain::{
        CommentEvent, CommitRecord, ContainerInput, CourseId, DeliverableId, FeedbackGiven,
        ResultKey, UserName,
    },
    ports::{ResultStore, ResultStoreError},
};
use crate::scheduler::{TaskName, TaskScheduler};
use chrono::TimeDelta;
use futures::future::BoxFuture;
use mockable::Clock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;

/// Service-level errors for feedback requests.
#[derive(Debug, Error)]
pub enum CommentError {
    /// No open deliverable matches the request.
    #[error("no open deliverable matches the request for course {course_id}")]
    UnknownDeliverable {
        /// Course the comment was made in.
        course_id: CourseId,
        /// Deliverable named in the comment, if any.
        requested: Option<DeliverableId>,
    },
    /// The result store failed.
    #[error(transparent)]
    Store(#[from] ResultStoreError),
    /// Queueing a test failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Posting to the commit failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// A notice could not be rendered.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// A re-check payload could not be encoded.
    #[error("failed to encode re-check payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// The scheduler refused the re-check.
    #[error("scheduler rejected re-check task '{0}'")]
    ScheduleRejected(String),
}

/// Result type for feedback requests.
pub type CommentResult<T> = Result<T, CommentError>;

/// Bounds on deferred re-checks and denial handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecheckSettings {
    /// Delay between re-checks.
    pub interval: Duration,
    /// Re-checks made before the request times out.
    pub max_attempts: u32,
    /// Post quota denials on the commit.
    pub post_denials: bool,
}

impl RecheckSettings {
    /// Reads the settings from runtime configuration.
    #[must_use]
    pub const fn from_config(config: &AutotestConfig) -> Self {
        Self {
            interval: config.recheck.interval(),
            max_attempts: config.recheck.max_attempts,
            post_denials: config.post_denials,
        }
    }
}

/// A feedback request waiting for its test result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingRequest {
    event: CommentEvent,
    deliv_id: DeliverableId,
    attempt: u32,
}

impl PendingRequest {
    fn key(&self) -> ResultKey {
        ResultKey::new(self.event.commit_url().clone(), self.deliv_id.clone())
    }

    fn pending_key(&self) -> PendingKey {
        (self.key(), self.event.user_name().clone())
    }
}

type PendingKey = (ResultKey, UserName);
type QuotaKey = (CourseId, DeliverableId, UserName);

/// Handles feedback-request comments.
///
/// Work on one `(commit, deliverable)` key runs under the dispatcher's key
/// lock, which scheduled re-checks acquire as well. Quota check and grant
/// for one `(course, deliverable, user)` triple are additionally serialized
/// so two commits cannot both spend the same quota.
pub struct CommentOrchestrator<C>
where
    C: Clock + Send + Sync + 'static,
{
    dispatcher: Arc<TestDispatcher<C>>,
    publisher: Arc<dyn FeedbackPublisher>,
    quota: QuotaGuard,
    formatter: FeedbackFormatter,
    scheduler: Arc<TaskScheduler<C>>,
    clock: Arc<C>,
    settings: RecheckSettings,
    quota_locks: KeyLocks<QuotaKey>,
    pending: Mutex<HashMap<PendingKey, TaskName>>,
}

impl<C> CommentOrchestrator<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        dispatcher: Arc<TestDispatcher<C>>,
        publisher: Arc<dyn FeedbackPublisher>,
        quota: QuotaGuard,
        scheduler: Arc<TaskScheduler<C>>,
        clock: Arc<C>,
        settings: RecheckSettings,
    ) -> Self {
        Self {
            dispatcher,
            publisher,
            quota,
            formatter: FeedbackFormatter::new(),
            scheduler,
            clock,
            settings,
            quota_locks: KeyLocks::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of requests waiting for a test result.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<PendingKey, TaskName>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self) -> &Arc<dyn ResultStore> {
        self.dispatcher.store()
    }

    /// Handles one feedback request.
    ///
    /// Posts feedback when a result exists and quota allows, denies when the
    /// cooldown has not elapsed, and otherwise queues a test and schedules a
    /// re-check. A grant is recorded only after a successful post.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError::UnknownDeliverable`] when no open deliverable
    /// matches (a usage notice is posted on a best-effort basis), or the
    /// store, queue, publish or scheduling failure that aborted the request.
    pub async fn on_comment(
        self: &Arc<Self>,
        comment: CommentEvent,
    ) -> CommentResult<CommentOutcome> {
        let resolved = self
            .dispatcher
            .resolver()
            .resolve_comment(comment.course_id(), comment.deliv_id());
        let Some(deliv_id) = resolved else {
            self.post_usage(&comment).await;
            return Err(CommentError::UnknownDeliverable {
                course_id: comment.course_id().clone(),
                requested: comment.deliv_id().cloned(),
            });
        };
        let event = comment.with_deliverable(deliv_id.clone());
        let key = ResultKey::new(event.commit_url().clone(), deliv_id.clone());
        let guard = self.dispatcher.lock_key(key.clone()).await;

        let pending_key = (key.clone(), event.user_name().clone());
        if let Some(record) = self
            .store()
            .get_output_record(key.commit_url(), key.deliv_id())
            .await?
        {
            let superseded = self.pending().remove(&pending_key);
            if let Some(task) = superseded {
                self.scheduler.cancel_task(task.as_str());
            }
            return self.respond(&event, &record, true).await;
        }

        let existing = self.pending().get(&pending_key).cloned();
        if let Some(task) = existing {
            tracing::debug!(key = %key, user = %event.user_name(), task = %task, "request already waiting");
            return Ok(CommentOutcome::Deferred { task });
        }

        let input = ContainerInput::from_comment(&event, deliv_id.clone(), &*self.clock);
        let decision = self.dispatcher.queue_if_untested(input, &guard).await?;
        self.store().save_comment(&event).await?;
        let task = self.schedule_recheck(PendingRequest {
            event,
            deliv_id,
            attempt: 1,
        })?;
        self.pending().insert(pending_key, task.clone());
        tracing::info!(key = %key, decision = decision.as_str(), task = %task, "feedback deferred until test completes");
        Ok(CommentOutcome::Deferred { task })
    }

    /// Answers a request whose test result exists. Caller holds the key lock.
    async fn respond(
        &self,
        event: &CommentEvent,
        record: &CommitRecord,
        record_comment: bool,
    ) -> CommentResult<CommentOutcome> {
        let user = event.user_name();
        let deliv_id = record.deliv_id();
        let already_given = self
            .store()
            .get_feedback_given_records_for_commit(record.commit_url(), user)
            .await?
            .iter()
            .any(|grant| grant.matches(event.course_id(), deliv_id, user));
        if already_given {
            let body = self.formatter.feedback(user, record)?;
            self.publisher
                .post_markdown(record.commit_url().as_str(), &body)
                .await?;
            if record_comment {
                self.store().save_comment(event).await?;
            }
            tracing::info!(key = %record.key(), user = %user, "feedback re-posted without charge");
            return Ok(CommentOutcome::Posted { charged: false });
        }

        let _quota_guard = self
            .quota_locks
            .lock((event.course_id().clone(), deliv_id.clone(), user.clone()))
            .await;
        let now = self.clock.utc();
        match self
            .quota
            .check_quota(event.course_id(), deliv_id, user, now)
            .await?
        {
            QuotaDecision::Allowed => {
                let body = self.formatter.feedback(user, record)?;
                if let Err(err) = self
                    .publisher
                    .post_markdown(record.commit_url().as_str(), &body)
                    .await
                {
                    tracing::warn!(key = %record.key(), user = %user, error = %err, "feedback post failed; no quota consumed");
                    return Err(err.into());
                }
                let grant = FeedbackGiven::new(
                    event.course_id().clone(),
                    deliv_id.clone(),
                    user.clone(),
                    record.commit_url().clone(),
                    now,
                );
                self.store().save_feedback_given_record(&grant).await?;
                if record_comment {
                    self.store().save_comment(event).await?;
                }
                tracing::info!(key = %record.key(), user = %user, "feedback posted");
                Ok(CommentOutcome::Posted { charged: true })
            }
            QuotaDecision::Denied { retry_after } => {
                if self.settings.post_denials {
                    let body = self.formatter.denial(user, deliv_id, retry_after)?;
                    self.publisher
                        .post_markdown(record.commit_url().as_str(), &body)
                        .await?;
                }
                tracing::info!(
                    key = %record.key(),
                    user = %user,
                    retry_after_secs = retry_after.as_secs(),
                    "feedback request denied"
                );
                Ok(CommentOutcome::Denied { retry_after })
            }
        }
    }

    async fn post_usage(&self, event: &CommentEvent) {
        let body = match self
            .formatter
            .usage(event.user_name(), event.course_id(), event.deliv_id())
        {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "failed to render usage notice");
                return;
            }
        };
        if let Err(err) = self
            .publisher
            .post_markdown(event.commit_url().as_str(), &body)
            .await
        {
            tracing::warn!(commit_url = %event.commit_url(), error = %err, "failed to post usage notice");
        }
    }

    fn schedule_recheck(self: &Arc<Self>, request: PendingRequest) -> CommentResult<TaskName> {
        let now = self.clock.utc();
        let name = recheck_task_name(&request, now);
        let fire_time = TimeDelta::from_std(self.settings.interval)
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .ok_or_else(|| CommentError::ScheduleRejected(name.clone()))?;
        let payload = serde_json::to_value(&request)?;
        let weak: Weak<Self> = Arc::downgrade(self);
        let registered = self.scheduler.register_task(
            &name,
            fire_time,
            move |data| -> BoxFuture<'static, ()> {
                let Some(orchestrator) = weak.upgrade() else {
                    return Box::pin(async {});
                };
                match serde_json::from_value::<PendingRequest>(data) {
                    Ok(decoded) => orchestrator.run_recheck(decoded),
                    Err(err) => Box::pin(async move {
                        tracing::error!(error = %err, "discarding unreadable re-check payload");
                    }),
                }
            },
            payload,
        );
        if !registered {
            return Err(CommentError::ScheduleRejected(name));
        }
        TaskName::new(name.clone()).map_err(|_| CommentError::ScheduleRejected(name))
    }

    fn run_recheck(self: Arc<Self>, request: PendingRequest) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let pending_key = request.pending_key();
            if let Err(err) = self.recheck(request).await {
                self.pending().remove(&pending_key);
                tracing::error!(key = %pending_key.0, user = %pending_key.1, error = %err, "re-check failed; request abandoned");
            }
        })
    }

    async fn recheck(self: &Arc<Self>, request: PendingRequest) -> CommentResult<()> {
        let key = request.key();
        let pending_key = request.pending_key();
        let guard = self.dispatcher.lock_key(key.clone()).await;
        if !self.pending().contains_key(&pending_key) {
            tracing::debug!(key = %key, "request already answered; re-check skipped");
            return Ok(());
        }

        let record = self
            .store()
            .get_output_record(key.commit_url(), key.deliv_id())
            .await?;
        if let Some(record) = record {
            self.pending().remove(&pending_key);
            let outcome = self.respond(&request.event, &record, false).await?;
            tracing::info!(key = %key, attempt = request.attempt, ?outcome, "deferred request answered");
            return Ok(());
        }

        if request.attempt >= self.settings.max_attempts {
            self.pending().remove(&pending_key);
            self.dispatcher.abandon(&guard);
            let body = self
                .formatter
                .timeout(request.event.user_name(), &request.deliv_id)?;
            self.publisher
                .post_markdown(key.commit_url().as_str(), &body)
                .await?;
            tracing::warn!(key = %key, attempts = request.attempt, "test result did not arrive in time");
            return Ok(());
        }

        let next = PendingRequest {
            attempt: request.attempt + 1,
            ..request
        };
        let attempt = next.attempt;
        let task = self.schedule_recheck(next)?;
        self.pending().insert(pending_key, task.clone());
        tracing::debug!(key = %key, attempt, task = %task, "result still missing; re-check rescheduled");
        Ok(())
    }
}

fn recheck_task_name(request: &PendingRequest, now: chrono::DateTime<chrono::Utc>) -> String {
    let digest = Sha256::digest(format!(
        "{}|{}|{}",
        request.key(),
        request.event.user_name(),
        now.to_rfc3339()
    ));
    let hex = format!("{digest:x}");
    let prefix = hex.get(..16).unwrap_or(&hex);
    format!("recheck-{prefix}-{}", request.attempt)
}
