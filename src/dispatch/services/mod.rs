//! Dispatch orchestration services.

mod dispatcher;

pub use dispatcher::{DispatchError, DispatchResult, ResultKeyGuard, TestDispatcher};
