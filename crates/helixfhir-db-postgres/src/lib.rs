//! PostgreSQL backend: versioned resource storage plus the relational
//! search parameter index.
//!
//! Writes keep the index in lockstep with the resource table: a put runs
//! the version bump, the history row, and the full index replacement in a
//! single transaction, so a committed resource is always searchable.

pub mod config;
pub mod error;
pub mod index;
pub mod pool;
pub mod schema;
pub mod store;

pub use config::PostgresConfig;
pub use error::{PostgresError, Result};
pub use index::PostgresParameterIndex;
pub use pool::create_pool;
pub use store::PostgresStore;
