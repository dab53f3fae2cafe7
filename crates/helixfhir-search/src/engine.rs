use crate::compile::{CompiledQuery, QueryCompiler};
use crate::error::SearchError;
use crate::extract::{IndexRow, extract};
use crate::parser::parse_query;
use crate::registry::ParameterRegistry;
use async_trait::async_trait;
use helixfhir_storage::{SearchHits, StorageError, StoredResource};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Search paging limits.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Page size when the request names none.
    pub default_count: u32,
    /// Hard ceiling on the page size a request may ask for.
    pub max_count: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_count: 50,
            max_count: 1000,
        }
    }
}

/// The backend side of search: holds the parameter index table and runs
/// compiled queries against it.
#[async_trait]
pub trait ParameterIndex: Send + Sync {
    /// Atomically replace every index row for a resource with a new set.
    async fn replace_all(
        &self,
        resource_id: i64,
        resource_type: &str,
        rows: &[IndexRow],
    ) -> Result<(), StorageError>;

    /// Run a compiled query for a resource type, returning matching
    /// internal ids and the unpaged total.
    async fn execute(
        &self,
        resource_type: &str,
        query: &CompiledQuery,
    ) -> Result<SearchHits, StorageError>;
}

/// Errors from the full search pipeline. Parse and compile failures are
/// client errors; execution failures come from the backend.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Ties the pipeline together: parse, compile, execute, and keep the index
/// in step with resource writes.
pub struct SearchEngine {
    registry: Arc<ParameterRegistry>,
    index: Arc<dyn ParameterIndex>,
    compiler: QueryCompiler,
}

impl SearchEngine {
    pub fn new(
        registry: Arc<ParameterRegistry>,
        index: Arc<dyn ParameterIndex>,
        config: SearchConfig,
    ) -> Self {
        Self {
            registry,
            index,
            compiler: QueryCompiler::new(config),
        }
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    /// Run a search given a resource type and a raw query string.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        resource_type: &str,
        query: &str,
    ) -> Result<SearchHits, EngineError> {
        let request = parse_query(&self.registry, resource_type, query)?;
        let compiled = self.compiler.compile(&request)?;
        debug!(
            resource_type,
            binds = compiled.params.len(),
            limit = compiled.limit,
            "compiled search"
        );
        let hits = self.index.execute(resource_type, &compiled).await?;
        Ok(hits)
    }

    /// Re-extract and replace the index rows for a written resource.
    /// Callers invoke this on the write path so the index never trails the
    /// resource table.
    #[instrument(skip(self, resource), fields(resource_type = %resource.resource_type, fhir_id = %resource.fhir_id))]
    pub async fn index_resource(&self, resource: &StoredResource) -> Result<(), StorageError> {
        let rows = if resource.deleted {
            Vec::new()
        } else {
            extract(
                &self.registry,
                resource.resource_type.as_str(),
                &resource.content,
            )
        };
        debug!(rows = rows.len(), "replacing index rows");
        self.index
            .replace_all(
                resource.internal_id,
                resource.resource_type.as_str(),
                &rows,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;
    use helixfhir_core::{FhirDateTime, ResourceType};
    use serde_json::json;
    use std::str::FromStr;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingIndex {
        executed: Mutex<Vec<(String, CompiledQuery)>>,
        replaced: Mutex<Vec<(i64, usize)>>,
    }

    #[async_trait]
    impl ParameterIndex for RecordingIndex {
        async fn replace_all(
            &self,
            resource_id: i64,
            _resource_type: &str,
            rows: &[IndexRow],
        ) -> Result<(), StorageError> {
            self.replaced
                .lock()
                .unwrap()
                .push((resource_id, rows.len()));
            Ok(())
        }

        async fn execute(
            &self,
            resource_type: &str,
            query: &CompiledQuery,
        ) -> Result<SearchHits, StorageError> {
            self.executed
                .lock()
                .unwrap()
                .push((resource_type.to_string(), query.clone()));
            Ok(SearchHits {
                ids: vec![1],
                total: 1,
            })
        }
    }

    fn engine(index: Arc<RecordingIndex>) -> SearchEngine {
        SearchEngine::new(
            Arc::new(default_registry()),
            index,
            SearchConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_search_reaches_backend() {
        let index = Arc::new(RecordingIndex::default());
        let engine = engine(index.clone());

        let hits = engine.search("Patient", "gender=female").await.unwrap();
        assert_eq!(hits.ids, vec![1]);

        let executed = index.executed.lock().unwrap();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].0, "Patient");
        assert!(executed[0].1.where_sql.contains("value_token_code"));
    }

    #[tokio::test]
    async fn test_search_rejects_before_backend() {
        let index = Arc::new(RecordingIndex::default());
        let engine = engine(index.clone());

        let err = engine
            .search("Patient", "favourite-colour=blue")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Search(_)));
        assert!(index.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_resource_replaces_rows() {
        let index = Arc::new(RecordingIndex::default());
        let engine = engine(index.clone());

        let resource = StoredResource {
            internal_id: 7,
            resource_type: ResourceType::Patient,
            fhir_id: "p1".to_string(),
            version_id: 1,
            last_updated: FhirDateTime::from_str("2024-03-15T10:30:00Z").unwrap(),
            deleted: false,
            content: json!({
                "resourceType": "Patient",
                "id": "p1",
                "gender": "female"
            }),
        };
        engine.index_resource(&resource).await.unwrap();

        let replaced = index.replaced.lock().unwrap();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced[0].0, 7);
        // id token plus gender token.
        assert_eq!(replaced[0].1, 2);
    }

    #[tokio::test]
    async fn test_index_resource_deleted_clears_rows() {
        let index = Arc::new(RecordingIndex::default());
        let engine = engine(index.clone());

        let resource = StoredResource {
            internal_id: 7,
            resource_type: ResourceType::Patient,
            fhir_id: "p1".to_string(),
            version_id: 2,
            last_updated: FhirDateTime::from_str("2024-03-16T00:00:00Z").unwrap(),
            deleted: true,
            content: json!({"resourceType": "Patient", "id": "p1"}),
        };
        engine.index_resource(&resource).await.unwrap();

        assert_eq!(index.replaced.lock().unwrap()[0].1, 0);
    }
}
