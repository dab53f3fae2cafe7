//! FHIR search over a relational parameter index.
//!
//! The pipeline has three stages. [`extract`] walks a resource body and
//! produces flat index rows for every search parameter the registry knows.
//! [`parser`] turns the query string of a search request into typed,
//! validated parameter values. [`compile`] turns those parsed values into a
//! parameterized SQL WHERE clause over the index table, which a backend
//! executes via the [`engine::ParameterIndex`] trait.

pub mod compile;
pub mod composite;
pub mod engine;
pub mod error;
pub mod extract;
pub mod params;
pub mod parser;
pub mod registry;
pub mod sql;

pub use compile::{CompiledQuery, QueryCompiler};
pub use engine::{EngineError, ParameterIndex, SearchConfig, SearchEngine};
pub use error::{SearchError, SearchResult};
pub use extract::{IndexRow, IndexedValue, extract};
pub use params::{SearchModifier, SearchParamKind, SearchParameter, SearchPrefix};
pub use parser::{ParsedSearchParameter, ParsedValue, SearchRequest, parse_query};
pub use registry::{CompositeComponent, CompositeDefinition, ParameterRegistry, RegistryBuilder};
