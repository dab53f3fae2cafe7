//! Schema bootstrap for the resource tables and the parameter index.

use sqlx_core::query::query;
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::Result;

/// Current resource versions. `id` is the internal surrogate key the
/// parameter index points at; `fhir_id` is the client-visible logical id.
const CREATE_RESOURCES: &str = "\
CREATE TABLE IF NOT EXISTS resources (
    id            BIGSERIAL PRIMARY KEY,
    resource_type TEXT        NOT NULL,
    fhir_id       TEXT        NOT NULL,
    version_id    INTEGER     NOT NULL DEFAULT 1,
    last_updated  TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted       BOOLEAN     NOT NULL DEFAULT FALSE,
    content       JSONB       NOT NULL,
    UNIQUE (resource_type, fhir_id)
)";

/// Every superseded version, including delete markers.
const CREATE_RESOURCES_HISTORY: &str = "\
CREATE TABLE IF NOT EXISTS resources_history (
    resource_id   BIGINT      NOT NULL REFERENCES resources (id) ON DELETE CASCADE,
    version_id    INTEGER     NOT NULL,
    last_updated  TIMESTAMPTZ NOT NULL,
    deleted       BOOLEAN     NOT NULL,
    content       JSONB       NOT NULL,
    PRIMARY KEY (resource_id, version_id)
)";

/// One row per extracted search parameter value. Kind-specific columns;
/// a row populates the columns of its kind and leaves the rest null.
const CREATE_SEARCH_PARAM_INDEX: &str = "\
CREATE TABLE IF NOT EXISTS search_param_index (
    resource_id           BIGINT NOT NULL REFERENCES resources (id) ON DELETE CASCADE,
    resource_type         TEXT   NOT NULL,
    param_name            TEXT   NOT NULL,
    value_string          TEXT,
    value_number          DOUBLE PRECISION,
    value_date            TIMESTAMPTZ,
    value_token_system    TEXT,
    value_token_code      TEXT,
    value_quantity        DOUBLE PRECISION,
    value_quantity_system TEXT,
    value_quantity_code   TEXT,
    value_reference       TEXT
)";

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_resources_type_fhir_id \
     ON resources (resource_type, fhir_id)",
    "CREATE INDEX IF NOT EXISTS idx_spi_resource \
     ON search_param_index (resource_id)",
    "CREATE INDEX IF NOT EXISTS idx_spi_param_token \
     ON search_param_index (resource_type, param_name, value_token_code)",
    "CREATE INDEX IF NOT EXISTS idx_spi_param_string \
     ON search_param_index (resource_type, param_name, value_string)",
    "CREATE INDEX IF NOT EXISTS idx_spi_param_date \
     ON search_param_index (resource_type, param_name, value_date)",
    "CREATE INDEX IF NOT EXISTS idx_spi_param_reference \
     ON search_param_index (resource_type, param_name, value_reference)",
];

/// Create tables and indexes if they do not exist yet.
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    query(CREATE_RESOURCES).execute(pool).await?;
    query(CREATE_RESOURCES_HISTORY).execute(pool).await?;
    query(CREATE_SEARCH_PARAM_INDEX).execute(pool).await?;
    for statement in CREATE_INDEXES {
        query(statement).execute(pool).await?;
    }
    info!("database schema ensured");
    Ok(())
}
