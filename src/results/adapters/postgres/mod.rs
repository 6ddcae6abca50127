//! `PostgreSQL` adapter for result persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresResultStore, ResultPgPool};
