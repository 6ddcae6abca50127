//! Startup wiring.
//!
//! [`AutoTest`] reads an [`AutotestConfig`], picks the result store and
//! publisher strategies it names, and assembles the dispatcher, scheduler and
//! comment orchestrator around them. Webhook handlers call
//! [`AutoTest::on_push`] and [`AutoTest::on_comment`]; the test runner drains
//! [`AutoTest::jobs`] and reports back through [`AutoTest::on_test_complete`].

use crate::config::{AutotestConfig, ConfigError, StorageConfig};
use crate::dispatch::{
    adapters::{ConfiguredDeliverableResolver, InMemoryJobQueue},
    domain::{DispatchOutcome, RecordOutcome},
    services::{DispatchResult, TestDispatcher},
};
use crate::feedback::{
    adapters::GitHubPublisher,
    domain::{CommentOutcome, FeedbackPolicy},
    ports::{PublishError, PublishedMessage},
    services::{CommentOrchestrator, CommentResult, QuotaGuard, RecheckSettings},
};
use crate::results::{
    adapters::{FileResultStore, InMemoryResultStore, PostgresResultStore},
    domain::{CommentEvent, CommitRecord, PushEvent},
    ports::{ResultStore, ResultStoreError},
};
use crate::scheduler::TaskScheduler;
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use thiserror::Error;

/// Failures while assembling the service.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The result store could not be opened.
    #[error(transparent)]
    Store(#[from] ResultStoreError),
    /// The publisher could not be built.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Assembled commit-testing service.
pub struct AutoTest<C = DefaultClock>
where
    C: Clock + Send + Sync + 'static,
{
    store: Arc<dyn ResultStore>,
    jobs: Arc<InMemoryJobQueue>,
    publisher: Arc<GitHubPublisher>,
    scheduler: Arc<TaskScheduler<C>>,
    dispatcher: Arc<TestDispatcher<C>>,
    orchestrator: Arc<CommentOrchestrator<C>>,
}

impl AutoTest<DefaultClock> {
    /// Starts the service on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] when configuration is invalid or a backend
    /// cannot be opened.
    pub async fn start(config: AutotestConfig) -> Result<Self, StartupError> {
        Self::start_with_clock(config, Arc::new(DefaultClock)).await
    }
}

impl<C> AutoTest<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Starts the service with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] when configuration is invalid or a backend
    /// cannot be opened.
    pub async fn start_with_clock(
        config: AutotestConfig,
        clock: Arc<C>,
    ) -> Result<Self, StartupError> {
        config.validate()?;
        let store = open_store(&config).await?;
        let publisher = Arc::new(GitHubPublisher::new(&config.publish)?);
        let resolver = Arc::new(ConfiguredDeliverableResolver::from_config(&config)?);
        let policy = FeedbackPolicy::from_config(&config)?;
        let jobs = Arc::new(InMemoryJobQueue::new());

        let scheduler = Arc::new(TaskScheduler::new(Arc::clone(&clock)));
        let dispatcher = Arc::new(TestDispatcher::new(
            Arc::clone(&store),
            jobs.clone(),
            resolver,
            Arc::clone(&clock),
        ));
        let orchestrator = Arc::new(CommentOrchestrator::new(
            Arc::clone(&dispatcher),
            publisher.clone(),
            QuotaGuard::new(Arc::clone(&store), policy),
            Arc::clone(&scheduler),
            clock,
            RecheckSettings::from_config(&config),
        ));
        tracing::info!(
            instance = config.instance.as_str(),
            course_id = %config.course_id,
            publishing = config.publish.enabled,
            "autotest started"
        );
        Ok(Self {
            store,
            jobs,
            publisher,
            scheduler,
            dispatcher,
            orchestrator,
        })
    }

    /// Handles a push event.
    ///
    /// # Errors
    ///
    /// See [`TestDispatcher::on_push`].
    pub async fn on_push(&self, event: PushEvent) -> DispatchResult<DispatchOutcome> {
        self.dispatcher.on_push(event).await
    }

    /// Handles a feedback-request comment.
    ///
    /// # Errors
    ///
    /// See [`CommentOrchestrator::on_comment`].
    pub async fn on_comment(&self, event: CommentEvent) -> CommentResult<CommentOutcome> {
        self.orchestrator.on_comment(event).await
    }

    /// Records a finished test reported by the runner.
    ///
    /// # Errors
    ///
    /// See [`TestDispatcher::on_test_complete`].
    pub async fn on_test_complete(&self, record: CommitRecord) -> DispatchResult<RecordOutcome> {
        self.dispatcher.on_test_complete(record).await
    }

    /// Returns the result store.
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Returns the queue the test runner consumes.
    #[must_use]
    pub const fn jobs(&self) -> &Arc<InMemoryJobQueue> {
        &self.jobs
    }

    /// Returns the task scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<TaskScheduler<C>> {
        &self.scheduler
    }

    /// Returns every message posted, or recorded while publishing is off.
    #[must_use]
    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.publisher.messages()
    }

    /// Cancels pending re-checks and stops accepting new ones.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        tracing::info!(
            waiting = self.orchestrator.pending_requests(),
            "autotest shut down"
        );
    }
}

async fn open_store(config: &AutotestConfig) -> Result<Arc<dyn ResultStore>, StartupError> {
    let instance = config.instance;
    let store: Arc<dyn ResultStore> = match &config.storage {
        StorageConfig::Memory => Arc::new(InMemoryResultStore::new(instance)),
        StorageConfig::File { dir } => Arc::new(FileResultStore::open(dir, instance)?),
        StorageConfig::Postgres { url, pool_size } => {
            let store = PostgresResultStore::connect(url, *pool_size, instance)?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
    };
    tracing::info!(backend = config.storage.backend_name(), "result store opened");
    Ok(store)
}
