//! Named, fire-once, time-triggered callbacks.
//!
//! The scheduler is an explicitly constructed instance shared by reference
//! with the components that need it. Every registration is kept as a task
//! record addressed by its name; records are never removed, so a name is
//! consumed for the lifetime of the scheduler.

pub mod domain;
pub mod service;

pub use domain::{InvalidTaskName, TaskName, TaskSnapshot, TaskState, TaskStatus};
pub use service::TaskScheduler;
