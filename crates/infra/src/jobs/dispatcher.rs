use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use filterjob_core::{CanonicalFilters, Clock, FileStatus, FilterRequest, RequestId};

use crate::queue::WorkQueue;

use super::JobServiceError;

/// Publishes filter work for files that are neither complete nor recently submitted.
#[derive(Clone)]
pub struct FilterDispatcher {
    queue: Arc<dyn WorkQueue>,
    topic: String,
    output_bucket: String,
    retry_window: Duration,
    clock: Arc<dyn Clock>,
}

impl FilterDispatcher {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        topic: impl Into<String>,
        output_bucket: impl Into<String>,
        retry_window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            topic: topic.into(),
            output_bucket: output_bucket.into(),
            retry_window,
            clock,
        }
    }

    pub fn output_url(&self, file_name: &str) -> String {
        format!("s3://{}/{}", self.output_bucket, file_name)
    }

    /// Publish one message per file that needs it and stamp its submission time.
    ///
    /// The caller persists the stamped files. Returns the number of messages published.
    pub async fn dispatch(
        &self,
        input_url: &str,
        files: &mut [FileStatus],
        filters: &CanonicalFilters,
    ) -> Result<usize, JobServiceError> {
        if files.is_empty() {
            return Err(JobServiceError::NoFilesSpecified);
        }

        let now = self.clock.now();
        let request_id = RequestId::new();
        let mut published = 0;

        for file in files.iter_mut() {
            if !file.needs_dispatch(now, self.retry_window) {
                debug!(file = file.name.as_str(), status = %file.status, "skipping dispatch");
                continue;
            }

            let message = FilterRequest {
                request_id,
                input_url: input_url.to_string(),
                output_url: self.output_url(&file.name),
                dimensions: filters.clone(),
            };
            let payload = serde_json::to_string(&message)
                .map_err(|e| JobServiceError::Internal(format!("failed to encode filter request: {}", e)))?;

            self.queue.publish(&self.topic, &payload).await.map_err(|e| {
                warn!(topic = self.topic.as_str(), error = %e, "failed to publish filter request");
                JobServiceError::ServiceUnavailable(e.to_string())
            })?;

            file.mark_submitted(now);
            published += 1;
        }

        if published > 0 {
            info!(%request_id, published, topic = self.topic.as_str(), "submitted filter requests");
        }
        Ok(published)
    }
}

impl std::fmt::Debug for FilterDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterDispatcher")
            .field("topic", &self.topic)
            .field("output_bucket", &self.output_bucket)
            .field("retry_window", &self.retry_window)
            .finish_non_exhaustive()
    }
}
