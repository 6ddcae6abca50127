//! Dispatch outcomes and targets.

mod outcome;

pub use outcome::{DeliveryTarget, DispatchOutcome, QueueDecision, RecordOutcome};
