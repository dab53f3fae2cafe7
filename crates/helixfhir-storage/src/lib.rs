//! Storage abstractions for FHIR resources.
//!
//! Defines the [`ResourceStore`] trait that backends implement, together
//! with the data types and error taxonomy shared across backends.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use traits::ResourceStore;
pub use types::{SearchHits, StoredResource};
