//! Output file formats the filter can generate.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Supported file generation formats.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileFormat {
    #[serde(rename = "CSV", alias = "csv")]
    Csv,
}

impl FileFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
        }
    }
}

impl core::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FileFormat::Csv => f.write_str("CSV"),
        }
    }
}

impl FromStr for FileFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CSV" => Ok(FileFormat::Csv),
            other => Err(DomainError::unsupported_format(other)),
        }
    }
}
