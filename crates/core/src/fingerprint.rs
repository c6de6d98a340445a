//! Content fingerprint: the dedup key and filename root for generated files.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::filter::CanonicalFilters;
use crate::format::FileFormat;
use crate::id::DataSetId;

/// SHA-256 over the dataset id and the canonical filter rendering, encoded as
/// unpadded URL-safe base64 (no `/`, `+` or `=`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(data_set_id: DataSetId, filters: &CanonicalFilters) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data_set_id.to_string().as_bytes());
        hasher.update(filters.to_string().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    /// Name of the generated file for `format`, e.g. `<fingerprint>.csv`.
    pub fn file_name(&self, format: FileFormat) -> String {
        format!("{}.{}", self.0, format.extension())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
