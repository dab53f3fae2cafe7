//! Versioned resource storage with write-path indexing.
//!
//! Every put and delete bumps the version, archives the superseded version
//! into `resources_history`, and replaces the resource's parameter index
//! rows, all inside one transaction. A committed write is immediately
//! searchable; there is no "indexed later" window to backfill.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use helixfhir_core::{FhirDateTime, ResourceType};
use helixfhir_search::extract::extract;
use helixfhir_search::registry::ParameterRegistry;
use helixfhir_storage::{ResourceStore, StorageError, StoredResource};
use serde_json::Value;
use sqlx_core::query::query;
use sqlx_core::row::Row;
use sqlx_postgres::{PgPool, PgRow};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::error::sqlx_to_storage;
use crate::index::{delete_rows, insert_rows};

const RESOURCE_COLUMNS: &str =
    "id, resource_type, fhir_id, version_id, last_updated, deleted, content";

pub struct PostgresStore {
    pool: PgPool,
    registry: Arc<ParameterRegistry>,
}

impl PostgresStore {
    pub fn new(pool: PgPool, registry: Arc<ParameterRegistry>) -> Self {
        Self { pool, registry }
    }
}

#[async_trait]
impl ResourceStore for PostgresStore {
    #[instrument(skip(self))]
    async fn get(
        &self,
        resource_type: &ResourceType,
        id: &str,
    ) -> Result<Option<StoredResource>, StorageError> {
        let sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources \
             WHERE resource_type = $1 AND fhir_id = $2"
        );
        let row = query(&sql)
            .bind(resource_type.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_to_storage)?;
        row.as_ref().map(row_to_resource).transpose()
    }

    #[instrument(skip(self))]
    async fn get_version(
        &self,
        resource_type: &ResourceType,
        id: &str,
        version_id: i32,
    ) -> Result<Option<StoredResource>, StorageError> {
        if let Some(current) = self.get(resource_type, id).await? {
            if current.version_id == version_id {
                return Ok(Some(current));
            }
        }
        let row = query(
            "SELECT r.id, r.resource_type, r.fhir_id, h.version_id, \
                    h.last_updated, h.deleted, h.content \
             FROM resources_history h \
             JOIN resources r ON r.id = h.resource_id \
             WHERE r.resource_type = $1 AND r.fhir_id = $2 AND h.version_id = $3",
        )
        .bind(resource_type.as_str())
        .bind(id)
        .bind(version_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_to_storage)?;
        row.as_ref().map(row_to_resource).transpose()
    }

    #[instrument(skip(self, content))]
    async fn put(
        &self,
        resource_type: &ResourceType,
        id: &str,
        content: Value,
    ) -> Result<StoredResource, StorageError> {
        if !content.is_object() {
            return Err(StorageError::invalid_resource(
                "resource body must be a JSON object",
            ));
        }
        let now = OffsetDateTime::now_utc();

        let mut tx = self.pool.begin().await.map_err(sqlx_to_storage)?;

        let existing = query(
            "SELECT id, version_id FROM resources \
             WHERE resource_type = $1 AND fhir_id = $2 FOR UPDATE",
        )
        .bind(resource_type.as_str())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(sqlx_to_storage)?;

        let (internal_id, version_id) = match existing {
            Some(row) => {
                let internal_id: i64 = row.try_get(0).map_err(sqlx_to_storage)?;
                let current_version: i32 = row.try_get(1).map_err(sqlx_to_storage)?;
                archive_current(&mut tx, internal_id).await?;
                query(
                    "UPDATE resources \
                     SET version_id = $2, last_updated = $3, deleted = FALSE, content = $4 \
                     WHERE id = $1",
                )
                .bind(internal_id)
                .bind(current_version + 1)
                .bind(now)
                .bind(&content)
                .execute(&mut *tx)
                .await
                .map_err(sqlx_to_storage)?;
                (internal_id, current_version + 1)
            }
            None => {
                let row = query(
                    "INSERT INTO resources \
                     (resource_type, fhir_id, version_id, last_updated, deleted, content) \
                     VALUES ($1, $2, 1, $3, FALSE, $4) RETURNING id",
                )
                .bind(resource_type.as_str())
                .bind(id)
                .bind(now)
                .bind(&content)
                .fetch_one(&mut *tx)
                .await
                .map_err(sqlx_to_storage)?;
                (row.try_get::<i64, _>(0).map_err(sqlx_to_storage)?, 1)
            }
        };

        // Index in the same transaction as the resource write, so the
        // index never lags a committed resource.
        let rows = extract(&self.registry, resource_type.as_str(), &content);
        delete_rows(&mut tx, internal_id)
            .await
            .map_err(sqlx_to_storage)?;
        insert_rows(&mut tx, internal_id, resource_type.as_str(), &rows)
            .await
            .map_err(sqlx_to_storage)?;

        tx.commit().await.map_err(sqlx_to_storage)?;
        debug!(internal_id, version_id, "resource written and indexed");

        Ok(StoredResource {
            internal_id,
            resource_type: resource_type.clone(),
            fhir_id: id.to_string(),
            version_id,
            last_updated: FhirDateTime::new(now),
            deleted: false,
            content,
        })
    }

    #[instrument(skip(self))]
    async fn delete(
        &self,
        resource_type: &ResourceType,
        id: &str,
    ) -> Result<(), StorageError> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool.begin().await.map_err(sqlx_to_storage)?;

        let existing = query(
            "SELECT id, version_id, deleted FROM resources \
             WHERE resource_type = $1 AND fhir_id = $2 FOR UPDATE",
        )
        .bind(resource_type.as_str())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(sqlx_to_storage)?;

        let Some(row) = existing else {
            return Err(StorageError::not_found(resource_type.as_str(), id));
        };
        let internal_id: i64 = row.try_get(0).map_err(sqlx_to_storage)?;
        let current_version: i32 = row.try_get(1).map_err(sqlx_to_storage)?;
        let already_deleted: bool = row.try_get(2).map_err(sqlx_to_storage)?;
        if already_deleted {
            return Err(StorageError::not_found(resource_type.as_str(), id));
        }

        archive_current(&mut tx, internal_id).await?;
        query(
            "UPDATE resources SET version_id = $2, last_updated = $3, deleted = TRUE \
             WHERE id = $1",
        )
        .bind(internal_id)
        .bind(current_version + 1)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_to_storage)?;

        // A deleted resource is unsearchable.
        delete_rows(&mut tx, internal_id)
            .await
            .map_err(sqlx_to_storage)?;

        tx.commit().await.map_err(sqlx_to_storage)?;
        debug!(internal_id, "resource deleted");
        Ok(())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_by_internal_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<StoredResource>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = ANY($1)"
        );
        let rows = query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_to_storage)?;

        let mut fetched = Vec::with_capacity(rows.len());
        for row in &rows {
            fetched.push(row_to_resource(row)?);
        }
        // Preserve the caller's order, which carries search ranking.
        fetched.sort_by_key(|r| {
            ids.iter()
                .position(|id| *id == r.internal_id)
                .unwrap_or(usize::MAX)
        });
        Ok(fetched)
    }
}

/// Copy the current resource row into the history table.
async fn archive_current(
    tx: &mut sqlx_core::transaction::Transaction<'_, sqlx_postgres::Postgres>,
    internal_id: i64,
) -> Result<(), StorageError> {
    query(
        "INSERT INTO resources_history \
         (resource_id, version_id, last_updated, deleted, content) \
         SELECT id, version_id, last_updated, deleted, content \
         FROM resources WHERE id = $1",
    )
    .bind(internal_id)
    .execute(&mut **tx)
    .await
    .map_err(sqlx_to_storage)?;
    Ok(())
}

fn row_to_resource(row: &PgRow) -> Result<StoredResource, StorageError> {
    let type_str: String = row.try_get("resource_type").map_err(sqlx_to_storage)?;
    let resource_type = ResourceType::from_str(&type_str)
        .map_err(|e| StorageError::invalid_resource(e.to_string()))?;
    let last_updated: OffsetDateTime =
        row.try_get("last_updated").map_err(sqlx_to_storage)?;
    Ok(StoredResource {
        internal_id: row.try_get("id").map_err(sqlx_to_storage)?,
        resource_type,
        fhir_id: row.try_get("fhir_id").map_err(sqlx_to_storage)?,
        version_id: row.try_get("version_id").map_err(sqlx_to_storage)?,
        last_updated: FhirDateTime::new(last_updated),
        deleted: row.try_get("deleted").map_err(sqlx_to_storage)?,
        content: row.try_get("content").map_err(sqlx_to_storage)?,
    })
}
