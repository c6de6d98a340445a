//! Postgres dataset catalogue.
//!
//! Reads `dimensional_data_set` (one row per dataset, holding its input URL) and
//! `dimension_value` (one row per dataset/dimension/value triple). Both tables are
//! owned by the loader that publishes datasets; this service only reads them.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use filterjob_core::{CanonicalFilters, DataSetId};

use super::{DataSetError, DataSetRepository};

#[derive(Debug, Clone)]
pub struct PostgresDataSetRepository {
    pool: Arc<PgPool>,
}

impl PostgresDataSetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl DataSetRepository for PostgresDataSetRepository {
    #[instrument(skip(self), fields(data_set_id = %id), err)]
    async fn find_input_url(&self, id: DataSetId) -> Result<Option<String>, DataSetError> {
        let row = sqlx::query(
            r#"
            SELECT ds.s3_url
            FROM dimensional_data_set ds
            WHERE ds.dimensional_data_set_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| DataSetError::Lookup(format!("find_input_url: {}", e)))?;

        row.map(|r| r.try_get::<String, _>("s3_url"))
            .transpose()
            .map_err(|e| DataSetError::Lookup(format!("failed to read s3_url: {}", e)))
    }

    #[instrument(skip(self, requested), fields(data_set_id = %id, pairs = requested.pairs().count()), err)]
    async fn find_matching_dimension_values(
        &self,
        id: DataSetId,
        requested: &CanonicalFilters,
    ) -> Result<CanonicalFilters, DataSetError> {
        let (dimensions, values): (Vec<String>, Vec<String>) = requested
            .pairs()
            .map(|(d, v)| (d.to_string(), v.to_string()))
            .unzip();
        if dimensions.is_empty() {
            return Ok(CanonicalFilters::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT dv.dimension_name, dv.value
            FROM dimension_value dv
            JOIN UNNEST($2::text[], $3::text[]) AS req(dimension_name, value)
              ON req.dimension_name = dv.dimension_name AND req.value = dv.value
            WHERE dv.dimensional_data_set_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(dimensions)
        .bind(values)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| DataSetError::Lookup(format!("find_matching_dimension_values: {}", e)))?;

        let mut matching = CanonicalFilters::new();
        for row in rows {
            let dimension: String = row
                .try_get("dimension_name")
                .map_err(|e| DataSetError::Lookup(format!("failed to read dimension_name: {}", e)))?;
            let value: String = row
                .try_get("value")
                .map_err(|e| DataSetError::Lookup(format!("failed to read value: {}", e)))?;
            matching.insert(dimension, [value]);
        }
        Ok(matching)
    }
}
