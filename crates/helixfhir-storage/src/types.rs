use helixfhir_core::{FhirDateTime, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A resource row as persisted by a backend.
///
/// `internal_id` is the backend's surrogate key and is what the parameter
/// index rows point at; `fhir_id` is the logical id visible to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    pub internal_id: i64,
    pub resource_type: ResourceType,
    pub fhir_id: String,
    pub version_id: i32,
    pub last_updated: FhirDateTime,
    pub deleted: bool,
    pub content: Value,
}

impl StoredResource {
    /// The `Type/id` form used by references.
    pub fn canonical_reference(&self) -> String {
        format!("{}/{}", self.resource_type, self.fhir_id)
    }
}

/// The result of executing a compiled search against the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    /// Internal ids of matching resources, in the backend's result order.
    pub ids: Vec<i64>,
    /// Total matches ignoring paging.
    pub total: u64,
}

impl SearchHits {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
