use chrono::Duration;

use crate::storage::DownloadUrlTemplate;

/// Tunables for the job engine.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Pending jobs at or above this count reject new asynchronous work.
    pub pending_job_limit: u64,
    pub output_bucket: String,
    pub topic: String,
    pub download_url_template: DownloadUrlTemplate,
    /// Lifetime of a job from creation.
    pub job_ttl: Duration,
    /// A file submitted less than this long ago is not re-submitted.
    pub submission_retry: Duration,
    /// Unreferenced file rows older than this are swept.
    pub file_retention: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            pending_job_limit: 100,
            output_bucket: "filter-output".to_string(),
            topic: "filter-requests".to_string(),
            download_url_template: DownloadUrlTemplate::new(
                "http://localhost:8080/download/{filename}",
            ),
            job_ttl: Duration::hours(1),
            submission_retry: Duration::hours(1),
            file_retention: Duration::hours(2),
        }
    }
}
