use std::sync::Arc;

use tracing::debug;

use filterjob_core::{CanonicalFilters, DataSetId};

use crate::datasets::DataSetRepository;

use super::JobServiceError;

/// Checks requested dimension filters against the values a dataset actually has.
#[derive(Clone)]
pub struct DimensionValidator {
    data_sets: Arc<dyn DataSetRepository>,
}

impl DimensionValidator {
    pub fn new(data_sets: Arc<dyn DataSetRepository>) -> Self {
        Self { data_sets }
    }

    /// Canonicalise `requested` down to the values the dataset confirms.
    ///
    /// Dimensions requested with no values are dropped without a lookup. Unknown
    /// values are dropped silently; a dimension with no known value left fails
    /// with `InvalidDimension`.
    pub async fn validate(
        &self,
        data_set_id: DataSetId,
        requested: &CanonicalFilters,
    ) -> Result<CanonicalFilters, JobServiceError> {
        let requested = requested.without_empty();
        if requested.is_empty() {
            return Ok(CanonicalFilters::new());
        }

        let actual = self
            .data_sets
            .find_matching_dimension_values(data_set_id, &requested)
            .await?;

        let mut validated = CanonicalFilters::new();
        for (dimension, values) in requested.iter() {
            let confirmed: Vec<&String> = match actual.get(dimension) {
                Some(known) => values.iter().filter(|v| known.contains(*v)).collect(),
                None => Vec::new(),
            };
            if confirmed.is_empty() {
                return Err(JobServiceError::invalid_dimension(dimension, values));
            }
            if confirmed.len() < values.len() {
                debug!(
                    %data_set_id,
                    dimension = dimension.as_str(),
                    dropped = values.len() - confirmed.len(),
                    "dropping unknown dimension values"
                );
            }
            validated.insert(dimension.clone(), confirmed.into_iter().cloned());
        }
        Ok(validated)
    }
}

impl std::fmt::Debug for DimensionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DimensionValidator").finish_non_exhaustive()
    }
}
