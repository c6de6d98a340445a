//! Incoming create-job request and the outgoing filter-work message.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::filter::{CanonicalFilters, DimensionFilter};
use crate::format::FileFormat;
use crate::id::{DataSetId, RequestId};

/// A request to create a new job:
///
/// ```json
/// {
///     "id": "the dataset uuid",
///     "dimensions": [{"id": "dimension id", "options": ["dimension", "values"]}],
///     "fileFormats": ["CSV"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    #[serde(rename = "id")]
    pub data_set_id: DataSetId,
    #[serde(default)]
    pub dimensions: Vec<DimensionFilter>,
    #[serde(default = "default_formats")]
    pub file_formats: BTreeSet<FileFormat>,
}

fn default_formats() -> BTreeSet<FileFormat> {
    BTreeSet::from([FileFormat::Csv])
}

impl CreateJobRequest {
    pub fn new(data_set_id: DataSetId, dimensions: Vec<DimensionFilter>) -> Self {
        Self {
            data_set_id,
            dimensions,
            file_formats: default_formats(),
        }
    }

    pub fn sorted_filters(&self) -> CanonicalFilters {
        CanonicalFilters::from_filters(&self.dimensions)
    }
}

/// Work message published to the filter worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    pub request_id: RequestId,
    pub input_url: String,
    pub output_url: String,
    pub dimensions: CanonicalFilters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_formats_default_to_csv() {
        let id = DataSetId::new();
        let req: CreateJobRequest = serde_json::from_value(serde_json::json!({
            "id": id.to_string(),
            "dimensions": [{"id": "colour", "options": ["red"]}]
        }))
        .unwrap();

        assert_eq!(req.data_set_id, id);
        assert_eq!(req.file_formats, BTreeSet::from([FileFormat::Csv]));
        assert_eq!(req.dimensions.len(), 1);
    }

    #[test]
    fn dimensions_are_optional() {
        let req: CreateJobRequest = serde_json::from_value(serde_json::json!({
            "id": DataSetId::new().to_string(),
            "fileFormats": ["CSV"]
        }))
        .unwrap();
        assert!(req.sorted_filters().is_empty());
    }

    #[test]
    fn filter_request_wire_shape() {
        let msg = FilterRequest {
            request_id: RequestId::new(),
            input_url: "s3://in/data.csv".to_string(),
            output_url: "s3://out/abc.csv".to_string(),
            dimensions: CanonicalFilters::from_filters(&[DimensionFilter::new("colour", ["red", "blue"])]),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json["requestId"].is_string());
        assert_eq!(json["inputUrl"], "s3://in/data.csv");
        assert_eq!(json["outputUrl"], "s3://out/abc.csv");
        assert_eq!(json["dimensions"], serde_json::json!({"colour": ["blue", "red"]}));
    }
}
