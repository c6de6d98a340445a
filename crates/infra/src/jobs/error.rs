use filterjob_core::DataSetId;

use crate::datasets::DataSetError;
use crate::storage::ObjectStoreError;
use crate::store::JobStoreError;

/// Failures of the create and check-status flows.
///
/// Every variant is terminal for the request that triggered it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobServiceError {
    #[error("Dataset not found: {0}")]
    NoSuchDataSet(DataSetId),

    #[error("{0}")]
    InvalidDimension(String),

    #[error("No such job: {0}")]
    NoSuchJob(String),

    #[error("Sorry - the number of requested jobs exceeds the limit")]
    TooManyRequests,

    #[error("Filter service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("No files specified")]
    NoFilesSpecified,

    #[error("internal error: {0}")]
    Internal(String),
}

impl JobServiceError {
    pub fn invalid_dimension<'a>(
        dimension: &str,
        values: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        let values: Vec<&str> = values.into_iter().map(String::as_str).collect();
        Self::InvalidDimension(format!(
            "Dataset does not contain dimension '{}' with any of the values [{}]",
            dimension,
            values.join(", ")
        ))
    }
}

impl From<JobStoreError> for JobServiceError {
    fn from(err: JobStoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<DataSetError> for JobServiceError {
    fn from(err: DataSetError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ObjectStoreError> for JobServiceError {
    fn from(err: ObjectStoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
