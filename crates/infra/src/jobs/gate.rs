use std::sync::Arc;

use tracing::warn;

use filterjob_core::Status;

use crate::store::JobStore;

use super::JobServiceError;

/// Pending-job backpressure.
///
/// The count and the subsequent save are not atomic, so concurrent creates can
/// overshoot the limit by the number of requests in flight. The limit is soft.
#[derive(Clone)]
pub struct SubmissionGate {
    store: Arc<dyn JobStore>,
    pending_job_limit: u64,
}

impl SubmissionGate {
    pub fn new(store: Arc<dyn JobStore>, pending_job_limit: u64) -> Self {
        Self {
            store,
            pending_job_limit,
        }
    }

    pub async fn may_admit(&self) -> Result<bool, JobServiceError> {
        let pending = self.store.count_jobs_with_status(Status::Pending).await?;
        Ok(pending < self.pending_job_limit)
    }

    /// `Ok` if new asynchronous work may be started, `TooManyRequests` otherwise.
    pub async fn admit(&self) -> Result<(), JobServiceError> {
        if self.may_admit().await? {
            Ok(())
        } else {
            warn!(limit = self.pending_job_limit, "pending job limit reached");
            Err(JobServiceError::TooManyRequests)
        }
    }
}

impl std::fmt::Debug for SubmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionGate")
            .field("pending_job_limit", &self.pending_job_limit)
            .finish_non_exhaustive()
    }
}
