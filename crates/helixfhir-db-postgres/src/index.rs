//! The relational search parameter index: one table, kind-specific
//! columns, whole-resource replacement on every write.

use async_trait::async_trait;
use helixfhir_search::compile::CompiledQuery;
use helixfhir_search::engine::ParameterIndex;
use helixfhir_search::extract::{IndexRow, IndexedValue};
use helixfhir_search::sql::SqlParam;
use helixfhir_storage::{SearchHits, StorageError};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::query::{Query, query};
use sqlx_core::row::Row;
use sqlx_postgres::{PgArguments, PgConnection, PgPool, Postgres};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::error::sqlx_to_storage;

/// Row lock on the owning resource. Taken before the delete so two
/// concurrent replacements of the same resource serialize.
const LOCK_RESOURCE_SQL: &str = "SELECT id FROM resources WHERE id = $1 FOR UPDATE";

const DELETE_ROWS_SQL: &str = "DELETE FROM search_param_index WHERE resource_id = $1";

const INSERT_ROWS_SQL: &str = "INSERT INTO search_param_index (\
    resource_id, resource_type, param_name, \
    value_string, value_number, value_date, \
    value_token_system, value_token_code, \
    value_quantity, value_quantity_system, value_quantity_code, \
    value_reference\
) SELECT $1::bigint, $2::text, * FROM UNNEST(\
    $3::text[], $4::text[], $5::float8[], $6::timestamptz[], \
    $7::text[], $8::text[], $9::float8[], $10::text[], $11::text[], \
    $12::text[]\
)";

/// Parameter index backed by the `search_param_index` table.
#[derive(Debug, Clone)]
pub struct PostgresParameterIndex {
    pool: PgPool,
}

impl PostgresParameterIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParameterIndex for PostgresParameterIndex {
    /// Replace the rows for one resource in a single transaction.
    ///
    /// The resource row is locked first so two concurrent writers to the
    /// same resource serialize instead of interleaving delete and insert.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn replace_all(
        &self,
        resource_id: i64,
        resource_type: &str,
        rows: &[IndexRow],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(sqlx_to_storage)?;
        lock_resource_row(&mut tx, resource_id)
            .await
            .map_err(sqlx_to_storage)?;
        delete_rows(&mut tx, resource_id)
            .await
            .map_err(sqlx_to_storage)?;
        insert_rows(&mut tx, resource_id, resource_type, rows)
            .await
            .map_err(sqlx_to_storage)?;
        tx.commit().await.map_err(sqlx_to_storage)?;
        Ok(())
    }

    #[instrument(skip(self, compiled))]
    async fn execute(
        &self,
        resource_type: &str,
        compiled: &CompiledQuery,
    ) -> Result<SearchHits, StorageError> {
        // $1 is the resource type; the compiled fragment uses $2 onward,
        // so limit and offset come after its binds.
        let next = compiled.params.len() + 2;
        let select_sql = format!(
            "SELECT r.id FROM resources r \
             WHERE r.resource_type = $1 AND r.deleted = FALSE AND ({}) \
             ORDER BY r.id LIMIT ${} OFFSET ${}",
            compiled.where_sql,
            next,
            next + 1
        );
        let count_sql = format!(
            "SELECT COUNT(*) FROM resources r \
             WHERE r.resource_type = $1 AND r.deleted = FALSE AND ({})",
            compiled.where_sql
        );
        debug!(sql = %select_sql, "executing search");

        let select = bind_compiled(query(&select_sql).bind(resource_type), &compiled.params)
            .bind(compiled.limit)
            .bind(compiled.offset);
        let rows = select
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_to_storage)?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get::<i64, _>(0).map_err(sqlx_to_storage)?);
        }

        let count_row = bind_compiled(query(&count_sql).bind(resource_type), &compiled.params)
            .fetch_one(&self.pool)
            .await
            .map_err(sqlx_to_storage)?;
        let total: i64 = count_row.try_get(0).map_err(sqlx_to_storage)?;

        Ok(SearchHits {
            ids,
            total: total.max(0) as u64,
        })
    }
}

/// Attach compiled bind values to a query in placeholder order.
fn bind_compiled<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        q = match param {
            SqlParam::Text(s) | SqlParam::Timestamp(s) => q.bind(s.as_str()),
            SqlParam::Integer(i) => q.bind(*i),
            SqlParam::Float(f) => q.bind(*f),
            SqlParam::Boolean(b) => q.bind(*b),
        };
    }
    q
}

pub(crate) async fn lock_resource_row(
    conn: &mut PgConnection,
    resource_id: i64,
) -> Result<(), SqlxError> {
    query(LOCK_RESOURCE_SQL)
        .bind(resource_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn delete_rows(
    conn: &mut PgConnection,
    resource_id: i64,
) -> Result<(), SqlxError> {
    query(DELETE_ROWS_SQL)
        .bind(resource_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// The per-column bind arrays for one UNNEST insert. Each source row
/// populates exactly one value column group; the rest stay NULL.
#[derive(Debug, Default, PartialEq)]
struct IndexColumns {
    param_names: Vec<String>,
    strings: Vec<Option<String>>,
    numbers: Vec<Option<f64>>,
    dates: Vec<Option<OffsetDateTime>>,
    token_systems: Vec<Option<String>>,
    token_codes: Vec<Option<String>>,
    quantities: Vec<Option<f64>>,
    quantity_systems: Vec<Option<String>>,
    quantity_codes: Vec<Option<String>>,
    references: Vec<Option<String>>,
}

impl IndexColumns {
    fn from_rows(rows: &[IndexRow]) -> Self {
        let mut cols = Self::default();
        for row in rows {
            cols.param_names.push(row.param.clone());
            let mut string_v = None;
            let mut number_v = None;
            let mut date_v = None;
            let mut token_system_v = None;
            let mut token_code_v = None;
            let mut quantity_v = None;
            let mut quantity_system_v = None;
            let mut quantity_code_v = None;
            let mut reference_v = None;
            match &row.value {
                IndexedValue::String(s) => string_v = Some(s.clone()),
                IndexedValue::Number(n) => number_v = Some(*n),
                IndexedValue::Date(d) => date_v = Some(*d),
                IndexedValue::Token { system, code } => {
                    token_system_v = system.clone();
                    token_code_v = Some(code.clone());
                }
                IndexedValue::Quantity {
                    value,
                    system,
                    code,
                } => {
                    quantity_v = Some(*value);
                    quantity_system_v = system.clone();
                    quantity_code_v = code.clone();
                }
                IndexedValue::Reference(r) => reference_v = Some(r.clone()),
            }
            cols.strings.push(string_v);
            cols.numbers.push(number_v);
            cols.dates.push(date_v);
            cols.token_systems.push(token_system_v);
            cols.token_codes.push(token_code_v);
            cols.quantities.push(quantity_v);
            cols.quantity_systems.push(quantity_system_v);
            cols.quantity_codes.push(quantity_code_v);
            cols.references.push(reference_v);
        }
        cols
    }
}

/// Batch insert via UNNEST so a resource's whole row set lands in one
/// statement.
pub(crate) async fn insert_rows(
    conn: &mut PgConnection,
    resource_id: i64,
    resource_type: &str,
    rows: &[IndexRow],
) -> Result<(), SqlxError> {
    if rows.is_empty() {
        return Ok(());
    }

    let cols = IndexColumns::from_rows(rows);
    query(INSERT_ROWS_SQL)
        .bind(resource_id)
        .bind(resource_type)
        .bind(&cols.param_names)
        .bind(&cols.strings)
        .bind(&cols.numbers)
        .bind(&cols.dates)
        .bind(&cols.token_systems)
        .bind(&cols.token_codes)
        .bind(&cols.quantities)
        .bind(&cols.quantity_systems)
        .bind(&cols.quantity_codes)
        .bind(&cols.references)
        .execute(conn)
        .await?;

    Ok(())
}
