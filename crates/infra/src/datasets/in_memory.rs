use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use filterjob_core::{CanonicalFilters, DataSetId};

use super::{DataSetError, DataSetRepository};

#[derive(Debug, Clone)]
struct DataSetRecord {
    input_url: String,
    dimensions: CanonicalFilters,
}

/// In-memory dataset catalogue for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDataSetRepository {
    data_sets: RwLock<HashMap<DataSetId, DataSetRecord>>,
}

impl InMemoryDataSetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a dataset with its known dimension values.
    pub fn insert(&self, id: DataSetId, input_url: impl Into<String>, dimensions: CanonicalFilters) {
        if let Ok(mut data_sets) = self.data_sets.write() {
            data_sets.insert(
                id,
                DataSetRecord {
                    input_url: input_url.into(),
                    dimensions,
                },
            );
        }
    }
}

#[async_trait]
impl DataSetRepository for InMemoryDataSetRepository {
    async fn find_input_url(&self, id: DataSetId) -> Result<Option<String>, DataSetError> {
        let data_sets = self
            .data_sets
            .read()
            .map_err(|_| DataSetError::Lookup("lock poisoned".to_string()))?;
        Ok(data_sets.get(&id).map(|r| r.input_url.clone()))
    }

    async fn find_matching_dimension_values(
        &self,
        id: DataSetId,
        requested: &CanonicalFilters,
    ) -> Result<CanonicalFilters, DataSetError> {
        let data_sets = self
            .data_sets
            .read()
            .map_err(|_| DataSetError::Lookup("lock poisoned".to_string()))?;
        let Some(record) = data_sets.get(&id) else {
            return Ok(CanonicalFilters::new());
        };

        let mut matching = CanonicalFilters::new();
        for (dimension, values) in requested.iter() {
            let Some(known) = record.dimensions.get(dimension) else {
                continue;
            };
            let found: Vec<&String> = values.iter().filter(|v| known.contains(*v)).collect();
            if !found.is_empty() {
                matching.insert(dimension.clone(), found.into_iter().cloned());
            }
        }
        Ok(matching)
    }
}
