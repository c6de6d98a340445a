use std::sync::Arc;

use tracing::debug;

use filterjob_core::Job;

use crate::storage::{DownloadUrlTemplate, ObjectStore};

use super::JobServiceError;

/// Syncs a job's files with what the workers have written to the output bucket.
///
/// Idempotent: with no change in the bucket a second pass changes nothing.
#[derive(Clone)]
pub struct Reconciler {
    storage: Arc<dyn ObjectStore>,
    bucket: String,
    download_urls: DownloadUrlTemplate,
}

impl Reconciler {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        download_urls: DownloadUrlTemplate,
    ) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
            download_urls,
        }
    }

    /// Promote every incomplete file found in storage, then the job if all are done.
    ///
    /// Returns the number of files promoted by this pass.
    pub async fn reconcile(&self, job: &mut Job) -> Result<usize, JobServiceError> {
        if job.is_complete() {
            return Ok(0);
        }

        let mut promoted = 0;
        for file in job.files.iter_mut().filter(|f| !f.is_complete()) {
            if self.storage.object_exists(&self.bucket, &file.name).await? {
                file.mark_complete(self.download_urls.expand(&file.name));
                promoted += 1;
                debug!(job_id = %job.id, file = file.name.as_str(), "file complete");
            }
        }
        job.refresh_status();
        Ok(promoted)
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("bucket", &self.bucket)
            .field("download_urls", &self.download_urls)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use filterjob_core::{FileStatus, Status};

    use super::*;
    use crate::storage::InMemoryObjectStore;

    fn setup() -> (Arc<InMemoryObjectStore>, Reconciler) {
        let storage = Arc::new(InMemoryObjectStore::new());
        let reconciler = Reconciler::new(
            storage.clone(),
            "out",
            DownloadUrlTemplate::new("https://dl.example/{filename}"),
        );
        (storage, reconciler)
    }

    fn job(names: &[&str]) -> Job {
        Job::new(
            names.iter().map(|n| FileStatus::pending(*n)),
            Utc::now() + Duration::hours(1),
        )
    }

    #[tokio::test]
    async fn partial_completion_leaves_job_pending() {
        let (storage, reconciler) = setup();
        storage.put("out", "a.csv");
        let mut job = job(&["a.csv", "b.csv"]);

        assert_eq!(reconciler.reconcile(&mut job).await.unwrap(), 1);
        assert_eq!(job.status, Status::Pending);
        assert!(job.files[0].is_complete());
        assert_eq!(job.files[0].url.as_deref(), Some("https://dl.example/a.csv"));
        assert!(!job.files[1].is_complete());
    }

    #[tokio::test]
    async fn all_files_present_completes_job() {
        let (storage, reconciler) = setup();
        storage.put("out", "a.csv");
        storage.put("out", "b.csv");
        let mut job = job(&["a.csv", "b.csv"]);

        reconciler.reconcile(&mut job).await.unwrap();
        assert_eq!(job.status, Status::Complete);
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let (storage, reconciler) = setup();
        storage.put("out", "a.csv");
        let mut job = job(&["a.csv", "b.csv"]);

        reconciler.reconcile(&mut job).await.unwrap();
        let after_first = job.clone();
        assert_eq!(reconciler.reconcile(&mut job).await.unwrap(), 0);
        assert_eq!(job, after_first);
    }

    #[tokio::test]
    async fn other_buckets_do_not_count() {
        let (storage, reconciler) = setup();
        storage.put("elsewhere", "a.csv");
        let mut job = job(&["a.csv"]);

        reconciler.reconcile(&mut job).await.unwrap();
        assert!(!job.is_complete());
    }

    #[tokio::test]
    async fn complete_job_skips_storage() {
        let (storage, reconciler) = setup();
        storage.set_unavailable(true);
        let mut job = job(&["a.csv"]);
        job.files[0].mark_complete("https://dl.example/a.csv");
        job.refresh_status();

        assert_eq!(reconciler.reconcile(&mut job).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn storage_failure_is_internal() {
        let (storage, reconciler) = setup();
        storage.set_unavailable(true);
        let mut job = job(&["a.csv"]);

        assert!(matches!(
            reconciler.reconcile(&mut job).await,
            Err(JobServiceError::Internal(_))
        ));
    }
}
