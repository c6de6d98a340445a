//! Service wiring: picks in-memory or persistent adapters and builds the job engine.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use filterjob_core::{Clock, SystemClock};
use filterjob_infra::{
    datasets::{DataSetRepository, InMemoryDataSetRepository, PostgresDataSetRepository},
    jobs::{ExpirySweeper, JobService, JobSettings},
    queue::{InMemoryWorkQueue, RedisPubSubWorkQueue, WorkQueue},
    storage::{HttpObjectStore, InMemoryObjectStore, ObjectStore},
    store::{InMemoryJobStore, JobStore, PostgresJobStore},
};

use crate::config::{AppConfig, DataSetSeed};

/// Everything the HTTP handlers and the background sweeper need.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub jobs: JobService,
    pub sweeper: ExpirySweeper,
}

/// Direct handles to the in-memory adapters, for seeding datasets and
/// simulating workers in dev and tests.
#[derive(Debug, Clone)]
pub struct InMemoryAdapters {
    pub store: Arc<InMemoryJobStore>,
    pub data_sets: Arc<InMemoryDataSetRepository>,
    pub objects: Arc<InMemoryObjectStore>,
    pub queue: Arc<InMemoryWorkQueue>,
}

impl InMemoryAdapters {
    pub fn seed(&self, seed: &DataSetSeed) {
        self.data_sets
            .insert(seed.id, seed.input_url.clone(), seed.dimensions.clone());
    }
}

impl AppServices {
    fn assemble(
        store: Arc<dyn JobStore>,
        data_sets: Arc<dyn DataSetRepository>,
        objects: Arc<dyn ObjectStore>,
        queue: Arc<dyn WorkQueue>,
        settings: JobSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sweeper = ExpirySweeper::new(store.clone(), clock.clone(), settings.file_retention);
        let jobs = JobService::new(store, data_sets, objects, queue, settings, clock);
        Self { jobs, sweeper }
    }
}

/// Build services from configuration.
///
/// Set `USE_PERSISTENT_STORES=true` for Postgres + Redis + HTTP object storage.
/// The in-memory mode starts with an empty dataset catalogue unless `SEED_DATA_SET_*`
/// registers one; nothing reaches real workers in that mode.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    if config.use_persistent_stores {
        if config.seed_data_set.is_some() {
            warn!("SEED_DATA_SET_ID is ignored with persistent stores");
        }
        build_persistent_services(config).await
    } else {
        let (services, adapters) =
            build_in_memory_services(config.jobs.clone(), Arc::new(SystemClock));
        match &config.seed_data_set {
            Some(seed) => {
                adapters.seed(seed);
                info!(data_set_id = %seed.id, "using in-memory stores with a seeded dataset");
            }
            None => warn!("using in-memory stores with no datasets; every create will be rejected"),
        }
        Ok(services)
    }
}

/// In-memory services with the adapters exposed.
pub fn build_in_memory_services(
    settings: JobSettings,
    clock: Arc<dyn Clock>,
) -> (AppServices, InMemoryAdapters) {
    let adapters = InMemoryAdapters {
        store: Arc::new(InMemoryJobStore::with_clock(clock.clone())),
        data_sets: Arc::new(InMemoryDataSetRepository::new()),
        objects: Arc::new(InMemoryObjectStore::new()),
        queue: Arc::new(InMemoryWorkQueue::new()),
    };
    let services = AppServices::assemble(
        adapters.store.clone(),
        adapters.data_sets.clone(),
        adapters.objects.clone(),
        adapters.queue.clone(),
        settings,
        clock,
    );
    (services, adapters)
}

async fn build_persistent_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES is enabled")?;

    info!(
        redis_url = config.redis_url.as_str(),
        object_store = config.object_store_endpoint.as_str(),
        "using persistent stores"
    );

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = PostgresJobStore::with_clock(pool.clone(), clock.clone());
    store
        .ensure_schema()
        .await
        .context("failed to prepare job store schema")?;

    let queue = RedisPubSubWorkQueue::new(&config.redis_url).context("invalid REDIS_URL")?;

    Ok(AppServices::assemble(
        Arc::new(store),
        Arc::new(PostgresDataSetRepository::new(pool)),
        Arc::new(HttpObjectStore::new(config.object_store_endpoint.clone())),
        Arc::new(queue),
        config.jobs.clone(),
        clock,
    ))
}

#[cfg(test)]
mod tests {
    use filterjob_core::{CanonicalFilters, CreateJobRequest, DataSetId, DimensionFilter, Status};

    use super::*;

    #[tokio::test]
    async fn seeded_data_set_accepts_jobs() {
        let (services, adapters) =
            build_in_memory_services(JobSettings::default(), Arc::new(SystemClock));
        let mut dimensions = CanonicalFilters::new();
        dimensions.insert("colour", ["red", "blue"]);
        let seed = DataSetSeed {
            id: DataSetId::new(),
            input_url: "s3://input/data.csv".to_string(),
            dimensions,
        };
        adapters.seed(&seed);

        let request =
            CreateJobRequest::new(seed.id, vec![DimensionFilter::new("colour", ["red"])]);
        let job = services.jobs.create_job(&request).await.unwrap();

        assert_eq!(job.status, Status::Pending);
        assert_eq!(adapters.queue.filter_requests()[0].input_url, "s3://input/data.csv");
    }
}
