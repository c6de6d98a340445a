//! Generation status shared by jobs and their output files.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Status of a job or output file. Serialized as `"Pending"` / `"Complete"`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(alias = "PENDING", alias = "pending")]
    Pending,
    #[serde(alias = "COMPLETE", alias = "complete")]
    Complete,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Complete => "Complete",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Status::Complete)
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "complete" => Ok(Status::Complete),
            other => Err(DomainError::validation(format!("unknown status: {other}"))),
        }
    }
}
