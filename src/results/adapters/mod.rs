//! Adapter implementations of the result store port.

pub mod file;
pub mod memory;
pub mod postgres;

pub use file::FileResultStore;
pub use memory::InMemoryResultStore;
pub use postgres::{PostgresResultStore, ResultPgPool};
