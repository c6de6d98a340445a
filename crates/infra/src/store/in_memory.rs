//! In-memory job store for tests/dev.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use filterjob_core::{Clock, FileStatus, Job, JobId, Status, SystemClock};

use super::{JobStore, JobStoreError, merge_file};

#[derive(Debug, Clone)]
struct JobRecord {
    id: JobId,
    status: Status,
    file_names: Vec<String>,
    expiry_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct FileRecord {
    file: FileStatus,
    touched_at: DateTime<Utc>,
}

/// In-memory job store. File rows are shared by name across jobs.
#[derive(Debug)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
    files: RwLock<HashMap<String, FileRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            files: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn job_count(&self) -> usize {
        self.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    pub fn file_count(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> JobStoreError {
    JobStoreError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn find_job(&self, id: JobId) -> Result<Option<Job>, JobStoreError> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        let Some(record) = jobs.get(&id) else {
            return Ok(None);
        };
        let files = self.files.read().map_err(poisoned)?;
        let job_files = record
            .file_names
            .iter()
            .map(|name| match files.get(name) {
                Some(r) => r.file.clone(),
                None => FileStatus::pending(name.clone()),
            })
            .collect();

        Ok(Some(Job {
            id: record.id,
            status: record.status,
            files: job_files,
            expiry_time: record.expiry_time,
        }))
    }

    async fn save_job(&self, job: &Job) -> Result<(), JobStoreError> {
        let now = self.clock.now();
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        let mut files = self.files.write().map_err(poisoned)?;

        for file in &job.files {
            let merged = match files.get(&file.name) {
                Some(existing) => merge_file(&existing.file, file),
                None => file.clone(),
            };
            files.insert(
                file.name.clone(),
                FileRecord {
                    file: merged,
                    touched_at: now,
                },
            );
        }

        jobs.insert(
            job.id,
            JobRecord {
                id: job.id,
                status: job.status,
                file_names: job.files.iter().map(|f| f.name.clone()).collect(),
                expiry_time: job.expiry_time,
            },
        );
        Ok(())
    }

    async fn delete_job(&self, id: JobId) -> Result<bool, JobStoreError> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        Ok(jobs.remove(&id).is_some())
    }

    async fn count_jobs_with_status(&self, status: Status) -> Result<u64, JobStoreError> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        Ok(jobs.values().filter(|j| j.status == status).count() as u64)
    }

    async fn find_file_status(&self, name: &str) -> Result<Option<FileStatus>, JobStoreError> {
        let files = self.files.read().map_err(poisoned)?;
        Ok(files.get(name).map(|r| r.file.clone()))
    }

    async fn delete_jobs_expiring_before(&self, before: DateTime<Utc>) -> Result<u64, JobStoreError> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        let count = jobs.len();
        jobs.retain(|_, j| j.expiry_time >= before);
        Ok((count - jobs.len()) as u64)
    }

    async fn delete_unreferenced_files_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, JobStoreError> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        let mut files = self.files.write().map_err(poisoned)?;

        let count = files.len();
        files.retain(|name, record| {
            let referenced = jobs
                .values()
                .any(|j| j.expiry_time >= now && j.file_names.iter().any(|n| n == name));
            referenced || record.touched_at >= cutoff
        });
        Ok((count - files.len()) as u64)
    }
}
