//! Job and file-status persistence.
//!
//! ## Design
//!
//! - A job row references its files by name; file rows are content-addressed
//!   and shared by every job that asks for the same fingerprint + format
//! - `save_job` is an upsert of the job and all of its files (merge by key),
//!   so two concurrent creates for the same file never fail on uniqueness
//! - File merges are monotone: a complete file never goes back to pending and
//!   the latest submission timestamp wins
//! - Deleting a job never deletes file rows; the sweeper removes file rows only
//!   once no live job references them

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use filterjob_core::{FileStatus, Job, JobId, Status};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryJobStore;
pub use postgres::PostgresJobStore;

/// Job store abstraction.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Get a job (with the current state of its shared files).
    async fn find_job(&self, id: JobId) -> Result<Option<Job>, JobStoreError>;

    /// Insert or update a job and merge each of its files into the file ledger.
    async fn save_job(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Delete a job. File rows are left for the sweeper. Returns whether a row existed.
    async fn delete_job(&self, id: JobId) -> Result<bool, JobStoreError>;

    /// Number of jobs currently in `status`.
    async fn count_jobs_with_status(&self, status: Status) -> Result<u64, JobStoreError>;

    /// Look up the ledger entry for a generated file name.
    async fn find_file_status(&self, name: &str) -> Result<Option<FileStatus>, JobStoreError>;

    /// Delete every job whose expiry instant is before `before`.
    async fn delete_jobs_expiring_before(&self, before: DateTime<Utc>) -> Result<u64, JobStoreError>;

    /// Delete file rows last touched before `cutoff` that no job expiring at or
    /// after `now` still references.
    async fn delete_unreferenced_files_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Merge an incoming file state into the stored one.
pub(crate) fn merge_file(existing: &FileStatus, incoming: &FileStatus) -> FileStatus {
    let (status, url) = if existing.is_complete() && !incoming.is_complete() {
        (existing.status, existing.url.clone())
    } else {
        (incoming.status, incoming.url.clone().or_else(|| existing.url.clone()))
    };
    FileStatus {
        name: incoming.name.clone(),
        status,
        url,
        submitted_at: existing.submitted_at.max(incoming.submitted_at),
    }
}
