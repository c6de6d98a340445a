//! Dataset lookup: input locations and known dimension values.

use async_trait::async_trait;

use filterjob_core::{CanonicalFilters, DataSetId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryDataSetRepository;
pub use postgres::PostgresDataSetRepository;

/// Read-only view of the dimensional datasets a job can be built from.
#[async_trait]
pub trait DataSetRepository: Send + Sync {
    /// Resolve a dataset id to the URL of its input file.
    async fn find_input_url(&self, id: DataSetId) -> Result<Option<String>, DataSetError>;

    /// Return the subset of the requested (dimension, value) pairs the dataset actually has.
    ///
    /// Dimensions with no surviving value are absent from the result.
    async fn find_matching_dimension_values(
        &self,
        id: DataSetId,
        requested: &CanonicalFilters,
    ) -> Result<CanonicalFilters, DataSetError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DataSetError {
    #[error("dataset lookup failed: {0}")]
    Lookup(String),
}
