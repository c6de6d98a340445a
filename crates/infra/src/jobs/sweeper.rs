//! Periodic cleanup of expired jobs and orphaned file rows.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use filterjob_core::Clock;

use crate::store::JobStore;

use super::JobServiceError;

/// Delay before the first sweep after spawning.
const INITIAL_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub jobs_deleted: u64,
    pub files_deleted: u64,
}

/// Deletes jobs past their expiry, then file rows that are both older than the
/// retention window and no longer referenced by a live job.
#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    file_retention: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>, file_retention: Duration) -> Self {
        Self {
            store,
            clock,
            file_retention,
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport, JobServiceError> {
        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(self.file_retention)
            .ok_or_else(|| JobServiceError::Internal("file retention out of range".to_string()))?;
        let jobs_deleted = self.store.delete_jobs_expiring_before(now).await?;
        let files_deleted = self
            .store
            .delete_unreferenced_files_before(cutoff, now)
            .await?;
        Ok(SweepReport {
            jobs_deleted,
            files_deleted,
        })
    }

    /// Run `sweep` every `period` on the current tokio runtime until shut down.
    pub fn spawn(self, period: std::time::Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + INITIAL_DELAY;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => match self.sweep().await {
                        Ok(report) if report != SweepReport::default() => {
                            info!(
                                jobs_deleted = report.jobs_deleted,
                                files_deleted = report.files_deleted,
                                "expiry sweep"
                            );
                        }
                        Ok(_) => debug!("expiry sweep found nothing"),
                        Err(err) => warn!(error = %err, "expiry sweep failed"),
                    },
                }
            }
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            join: Some(join),
        }
    }
}

impl std::fmt::Debug for ExpirySweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirySweeper")
            .field("file_retention", &self.file_retention)
            .finish_non_exhaustive()
    }
}

/// Handle to stop and join the background sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Request graceful shutdown and wait for the sweeper to stop.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                warn!(error = %err, "expiry sweeper task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use filterjob_core::{FileStatus, Job, ManualClock};

    use super::*;
    use crate::store::InMemoryJobStore;

    fn setup() -> (Arc<ManualClock>, Arc<InMemoryJobStore>, ExpirySweeper) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
        let store = Arc::new(InMemoryJobStore::with_clock(clock.clone()));
        let sweeper = ExpirySweeper::new(store.clone(), clock.clone(), Duration::hours(2));
        (clock, store, sweeper)
    }

    #[tokio::test]
    async fn removes_expired_jobs_only() {
        let (clock, store, sweeper) = setup();
        let old = Job::new([FileStatus::pending("a.csv")], clock.now() + Duration::minutes(30));
        let fresh = Job::new([FileStatus::pending("b.csv")], clock.now() + Duration::hours(2));
        store.save_job(&old).await.unwrap();
        store.save_job(&fresh).await.unwrap();

        clock.advance(Duration::hours(1));
        let report = sweeper.sweep().await.unwrap();

        assert_eq!(report.jobs_deleted, 1);
        assert!(store.find_job(old.id).await.unwrap().is_none());
        assert!(store.find_job(fresh.id).await.unwrap().is_some());
        // Files are retained for the retention window.
        assert_eq!(report.files_deleted, 0);
        assert!(store.find_file_status("a.csv").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn orphaned_files_go_after_retention() {
        let (clock, store, sweeper) = setup();
        let job = Job::new([FileStatus::pending("a.csv")], clock.now() + Duration::hours(1));
        store.save_job(&job).await.unwrap();

        clock.advance(Duration::hours(3));
        let report = sweeper.sweep().await.unwrap();

        assert_eq!(report, SweepReport { jobs_deleted: 1, files_deleted: 1 });
        assert!(store.find_file_status("a.csv").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn shared_file_survives_while_a_live_job_references_it() {
        let (clock, store, sweeper) = setup();
        let early = Job::new([FileStatus::pending("shared.csv")], clock.now() + Duration::hours(1));
        store.save_job(&early).await.unwrap();

        clock.advance(Duration::minutes(50));
        let late = Job::new([FileStatus::pending("shared.csv")], clock.now() + Duration::hours(4));
        // Saved with an old touch time so only the live reference protects it.
        clock.advance(Duration::hours(-3));
        store.save_job(&late).await.unwrap();
        clock.advance(Duration::hours(5));

        let report = sweeper.sweep().await.unwrap();
        assert_eq!(report.jobs_deleted, 1);
        assert_eq!(report.files_deleted, 0);
        assert!(store.find_file_status("shared.csv").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unrepresentable_retention_fails_without_deleting() {
        let (clock, store, _) = setup();
        let job = Job::new([FileStatus::pending("a.csv")], clock.now() - Duration::minutes(1));
        store.save_job(&job).await.unwrap();
        let sweeper = ExpirySweeper::new(
            store.clone(),
            clock.clone(),
            Duration::try_seconds(10_000_000_000_000).unwrap(),
        );

        assert!(matches!(sweeper.sweep().await, Err(JobServiceError::Internal(_))));
        assert!(store.find_job(job.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn spawned_sweeper_stops_on_shutdown() {
        let (clock, store, sweeper) = setup();
        let job = Job::new([FileStatus::pending("a.csv")], clock.now() - Duration::minutes(1));
        store.save_job(&job).await.unwrap();

        let handle = sweeper.spawn(std::time::Duration::from_millis(20));
        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        handle.shutdown().await;

        assert!(store.find_job(job.id).await.unwrap().is_none());
    }
}
