use crate::error::StorageResult;
use crate::types::StoredResource;
use async_trait::async_trait;
use helixfhir_core::ResourceType;
use serde_json::Value;

/// Versioned CRUD over FHIR resources.
///
/// Backends are expected to keep history on every write and to update any
/// derived indexes atomically with the resource row itself.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch the current version of a resource, including deleted markers.
    async fn get(
        &self,
        resource_type: &ResourceType,
        id: &str,
    ) -> StorageResult<Option<StoredResource>>;

    /// Fetch a specific historical version.
    async fn get_version(
        &self,
        resource_type: &ResourceType,
        id: &str,
        version_id: i32,
    ) -> StorageResult<Option<StoredResource>>;

    /// Create or update a resource. Creates version 1 when the id is new,
    /// otherwise increments the version and archives the previous one.
    async fn put(
        &self,
        resource_type: &ResourceType,
        id: &str,
        content: Value,
    ) -> StorageResult<StoredResource>;

    /// Soft-delete a resource. The deletion is itself a new version.
    async fn delete(&self, resource_type: &ResourceType, id: &str) -> StorageResult<()>;

    /// Fetch current versions by internal id, preserving input order.
    async fn get_by_internal_ids(&self, ids: &[i64]) -> StorageResult<Vec<StoredResource>>;
}
