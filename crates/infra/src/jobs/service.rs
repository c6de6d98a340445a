//! Create and check-status flows.
//!
//! Create: resolve dataset -> validate filters -> build files from the ledger ->
//! reconcile -> (complete: save) | (gate -> dispatch -> save).
//!
//! Check: load -> (expired: delete, not found) | (reconcile -> save).

use std::sync::Arc;

use tracing::{debug, info, instrument};

use filterjob_core::{Clock, CreateJobRequest, FileStatus, Fingerprint, Job, JobId};

use crate::datasets::DataSetRepository;
use crate::queue::WorkQueue;
use crate::storage::ObjectStore;
use crate::store::JobStore;

use super::{
    DimensionValidator, FilterDispatcher, JobServiceError, JobSettings, Reconciler, SubmissionGate,
};

/// Job orchestration over the collaborator adapters.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    data_sets: Arc<dyn DataSetRepository>,
    validator: DimensionValidator,
    reconciler: Reconciler,
    gate: SubmissionGate,
    dispatcher: FilterDispatcher,
    clock: Arc<dyn Clock>,
    settings: JobSettings,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        data_sets: Arc<dyn DataSetRepository>,
        objects: Arc<dyn ObjectStore>,
        queue: Arc<dyn WorkQueue>,
        settings: JobSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            validator: DimensionValidator::new(data_sets.clone()),
            reconciler: Reconciler::new(
                objects,
                settings.output_bucket.clone(),
                settings.download_url_template.clone(),
            ),
            gate: SubmissionGate::new(store.clone(), settings.pending_job_limit),
            dispatcher: FilterDispatcher::new(
                queue,
                settings.topic.clone(),
                settings.output_bucket.clone(),
                settings.submission_retry,
                clock.clone(),
            ),
            store,
            data_sets,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Create a job for `request`, reusing any progress already made on the same files.
    #[instrument(skip(self, request), fields(data_set_id = %request.data_set_id))]
    pub async fn create_job(&self, request: &CreateJobRequest) -> Result<Job, JobServiceError> {
        if request.file_formats.is_empty() {
            return Err(JobServiceError::NoFilesSpecified);
        }

        let input_url = self
            .data_sets
            .find_input_url(request.data_set_id)
            .await?
            .ok_or(JobServiceError::NoSuchDataSet(request.data_set_id))?;

        let filters = self
            .validator
            .validate(request.data_set_id, &request.sorted_filters())
            .await?;
        debug!(filters = %filters, formats = ?request.file_formats, "validated job request");

        let fingerprint = Fingerprint::compute(request.data_set_id, &filters);
        let mut files = Vec::with_capacity(request.file_formats.len());
        for format in &request.file_formats {
            let name = fingerprint.file_name(*format);
            let file = match self.store.find_file_status(&name).await? {
                Some(existing) => existing,
                None => FileStatus::pending(name),
            };
            files.push(file);
        }

        let expiry_time = self
            .clock
            .now()
            .checked_add_signed(self.settings.job_ttl)
            .ok_or_else(|| JobServiceError::Internal("job expiry out of range".to_string()))?;
        let mut job = Job::new(files, expiry_time);

        // Earlier jobs may already have produced every file.
        self.reconciler.reconcile(&mut job).await?;
        if job.is_complete() {
            self.store.save_job(&job).await?;
            info!(job_id = %job.id, %fingerprint, "job satisfied from existing files");
            return Ok(job);
        }

        self.gate.admit().await?;
        let published = self
            .dispatcher
            .dispatch(&input_url, &mut job.files, &filters)
            .await?;
        self.store.save_job(&job).await?;

        info!(job_id = %job.id, %fingerprint, published, "job created");
        Ok(job)
    }

    /// Current, reconciled state of a job. Expired jobs are deleted and reported missing.
    #[instrument(skip_all, fields(job_id = %id))]
    pub async fn check_job_status(&self, id: JobId) -> Result<Job, JobServiceError> {
        let mut job = self
            .store
            .find_job(id)
            .await?
            .ok_or_else(|| JobServiceError::NoSuchJob(id.to_string()))?;

        if job.is_expired(self.clock.now()) {
            self.store.delete_job(id).await?;
            debug!("deleted expired job on lookup");
            return Err(JobServiceError::NoSuchJob(id.to_string()));
        }

        let was_complete = job.is_complete();
        self.reconciler.reconcile(&mut job).await?;
        self.store.save_job(&job).await?;
        if job.is_complete() && !was_complete {
            info!("job complete");
        }
        Ok(job)
    }
}

impl std::fmt::Debug for JobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
