//! Postgres-backed job store.
//!
//! ## Schema
//!
//! - `jobs`: one row per job (`id`, `status`, `expiry_time`)
//! - `file_status`: one row per generated file name, shared across jobs
//! - `job_files`: ordered link rows, cascading on job deletion
//!
//! Every `save_job` runs in a single transaction. File rows are merged with
//! `ON CONFLICT ... DO UPDATE` so concurrent creates for the same file converge.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use filterjob_core::{Clock, FileStatus, Job, JobId, Status, SystemClock};

use super::{JobStore, JobStoreError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id UUID PRIMARY KEY,
        status TEXT NOT NULL,
        expiry_time TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS file_status (
        name TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        url TEXT,
        submitted_at TIMESTAMPTZ,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_files (
        job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        file_name TEXT NOT NULL,
        position INT NOT NULL,
        PRIMARY KEY (job_id, file_name)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status)",
    "CREATE INDEX IF NOT EXISTS idx_job_files_file_name ON job_files (file_name)",
];

/// Postgres job store.
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: Arc<PgPool>,
    clock: Arc<dyn Clock>,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool: Arc::new(pool),
            clock,
        }
    }

    /// Create tables and indexes if missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), JobStoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

fn parse_status(raw: &str) -> Result<Status, JobStoreError> {
    raw.parse()
        .map_err(|_| JobStoreError::Corrupt(format!("unknown status '{}'", raw)))
}

#[async_trait]
impl JobStore for PostgresJobStore {
    #[instrument(skip(self), fields(job_id = %id), err)]
    async fn find_job(&self, id: JobId) -> Result<Option<Job>, JobStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, status, expiry_time
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_job", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = row
            .try_get("status")
            .map_err(|e| JobStoreError::Corrupt(format!("failed to read status: {}", e)))?;
        let expiry_time: DateTime<Utc> = row
            .try_get("expiry_time")
            .map_err(|e| JobStoreError::Corrupt(format!("failed to read expiry_time: {}", e)))?;

        let file_rows = sqlx::query(
            r#"
            SELECT jf.file_name, fs.status, fs.url, fs.submitted_at
            FROM job_files jf
            LEFT JOIN file_status fs ON fs.name = jf.file_name
            WHERE jf.job_id = $1
            ORDER BY jf.position ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_job_files", e))?;

        let mut files = Vec::with_capacity(file_rows.len());
        for row in file_rows {
            let name: String = row
                .try_get("file_name")
                .map_err(|e| JobStoreError::Corrupt(format!("failed to read file_name: {}", e)))?;
            let status: Option<String> = row
                .try_get("status")
                .map_err(|e| JobStoreError::Corrupt(format!("failed to read file status: {}", e)))?;
            let url: Option<String> = row
                .try_get("url")
                .map_err(|e| JobStoreError::Corrupt(format!("failed to read url: {}", e)))?;
            let submitted_at: Option<DateTime<Utc>> = row
                .try_get("submitted_at")
                .map_err(|e| JobStoreError::Corrupt(format!("failed to read submitted_at: {}", e)))?;

            files.push(FileStatus {
                name,
                status: status.as_deref().map(parse_status).transpose()?.unwrap_or_default(),
                url,
                submitted_at,
            });
        }

        Ok(Some(Job {
            id,
            status: parse_status(&status)?,
            files,
            expiry_time,
        }))
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, file_count = job.files.len()), err)]
    async fn save_job(&self, job: &Job) -> Result<(), JobStoreError> {
        let now = self.clock.now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, status, expiry_time)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status, expiry_time = EXCLUDED.expiry_time
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.status.as_str())
        .bind(job.expiry_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_job", e))?;

        for file in &job.files {
            sqlx::query(
                r#"
                INSERT INTO file_status (name, status, url, submitted_at, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (name) DO UPDATE
                SET status = CASE WHEN file_status.status = 'Complete'
                                  THEN file_status.status ELSE EXCLUDED.status END,
                    url = CASE WHEN file_status.status = 'Complete'
                               THEN file_status.url ELSE COALESCE(EXCLUDED.url, file_status.url) END,
                    submitted_at = GREATEST(file_status.submitted_at, EXCLUDED.submitted_at),
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&file.name)
            .bind(file.status.as_str())
            .bind(file.url.as_deref())
            .bind(file.submitted_at)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("upsert_file_status", e))?;
        }

        sqlx::query("DELETE FROM job_files WHERE job_id = $1")
            .bind(job.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_job_files", e))?;

        for (position, file) in job.files.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO job_files (job_id, file_name, position)
                VALUES ($1, $2, $3)
                ON CONFLICT (job_id, file_name) DO NOTHING
                "#,
            )
            .bind(job.id.as_uuid())
            .bind(&file.name)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_job_file", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id), err)]
    async fn delete_job(&self, id: JobId) -> Result<bool, JobStoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_job", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn count_jobs_with_status(&self, status: Status) -> Result<u64, JobStoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS job_count FROM jobs WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_jobs_with_status", e))?;
        let count: i64 = row
            .try_get("job_count")
            .map_err(|e| JobStoreError::Corrupt(format!("failed to read job_count: {}", e)))?;
        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self), err)]
    async fn find_file_status(&self, name: &str) -> Result<Option<FileStatus>, JobStoreError> {
        let row = sqlx::query(
            r#"
            SELECT name, status, url, submitted_at
            FROM file_status
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_file_status", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let status: String = row
            .try_get("status")
            .map_err(|e| JobStoreError::Corrupt(format!("failed to read status: {}", e)))?;

        Ok(Some(FileStatus {
            name: row
                .try_get("name")
                .map_err(|e| JobStoreError::Corrupt(format!("failed to read name: {}", e)))?,
            status: parse_status(&status)?,
            url: row
                .try_get("url")
                .map_err(|e| JobStoreError::Corrupt(format!("failed to read url: {}", e)))?,
            submitted_at: row
                .try_get("submitted_at")
                .map_err(|e| JobStoreError::Corrupt(format!("failed to read submitted_at: {}", e)))?,
        }))
    }

    #[instrument(skip(self), err)]
    async fn delete_jobs_expiring_before(&self, before: DateTime<Utc>) -> Result<u64, JobStoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE expiry_time < $1")
            .bind(before)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_jobs_expiring_before", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn delete_unreferenced_files_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, JobStoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM file_status fs
            WHERE fs.updated_at < $1
              AND NOT EXISTS (
                  SELECT 1
                  FROM job_files jf
                  JOIN jobs j ON j.id = jf.job_id
                  WHERE jf.file_name = fs.name AND j.expiry_time >= $2
              )
            "#,
        )
        .bind(cutoff)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_unreferenced_files_before", e))?;
        Ok(result.rows_affected())
    }
}

/// Map SQLx errors to JobStoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> JobStoreError {
    match err {
        sqlx::Error::Database(db_err) => JobStoreError::Storage(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            JobStoreError::Storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            JobStoreError::Corrupt(format!("decode error in {}: {}", operation, err))
        }
        _ => JobStoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}
