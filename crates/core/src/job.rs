//! Client-visible job aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::file_status::FileStatus;
use crate::id::JobId;
use crate::status::Status;

/// A request for one or more output files, with an expiry instant.
///
/// Invariant: `status == Complete` iff every file is complete. Use
/// [`Job::refresh_status`] after mutating files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: Status,
    pub files: Vec<FileStatus>,
    #[serde(skip_serializing, default = "Utc::now")]
    pub expiry_time: DateTime<Utc>,
}

impl Job {
    /// Create a pending job with a fresh id.
    pub fn new(files: impl IntoIterator<Item = FileStatus>, expiry_time: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            status: Status::Pending,
            files: files.into_iter().collect(),
            expiry_time,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    /// Expired once the expiry instant is strictly in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time < now
    }

    pub fn all_files_complete(&self) -> bool {
        self.files.iter().all(FileStatus::is_complete)
    }

    /// Promote the job once all of its files are complete.
    pub fn refresh_status(&mut self) {
        if self.all_files_complete() {
            self.status = Status::Complete;
        }
    }
}
