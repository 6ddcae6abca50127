//! Autotest: commit-testing orchestration for course repositories.
//!
//! Receives push and feedback-request events, queues at most one test run per
//! commit and deliverable, and posts rate-limited feedback back onto commits.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Records and policies with no infrastructure dependencies
//! - **Ports**: Trait interfaces for storage, queues and publishing
//! - **Adapters**: In-memory, file, `PostgreSQL` and GitHub implementations
//! - **Services**: Orchestration over the ports
//!
//! # Modules
//!
//! - [`results`]: Event and result records and the result store
//! - [`dispatch`]: Push handling and test job queueing
//! - [`feedback`]: Quota, formatting, publishing and comment handling
//! - [`scheduler`]: Named one-shot timers with an explicit lifecycle
//! - [`app`]: Startup wiring from [`config::AutotestConfig`]

pub mod app;
pub mod config;
pub mod dispatch;
pub mod feedback;
pub mod key_lock;
pub mod logging;
pub mod results;
pub mod scheduler;

#[cfg(test)]
mod test_support;
