//! Environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use filterjob_core::{CanonicalFilters, DataSetId};
use filterjob_infra::jobs::JobSettings;
use filterjob_infra::storage::DownloadUrlTemplate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jobs: JobSettings,
    pub sweep_interval: Duration,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub redis_url: String,
    pub object_store_endpoint: String,
    /// Dataset registered at startup when running on in-memory stores.
    pub seed_data_set: Option<DataSetSeed>,
}

/// One dataset for the in-memory catalogue, read from `SEED_DATA_SET_ID`,
/// `SEED_DATA_SET_URL` and `SEED_DATA_SET_DIMENSIONS` (`dim=a,b;other=c`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSetSeed {
    pub id: DataSetId,
    pub input_url: String,
    pub dimensions: CanonicalFilters,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jobs: JobSettings::default(),
            sweep_interval: Duration::from_secs(60),
            use_persistent_stores: false,
            database_url: None,
            redis_url: "redis://localhost:6379".to_string(),
            object_store_endpoint: "http://localhost:9000".to_string(),
            seed_data_set: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("BIND_ADDR") {
            config.bind_addr = v.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "BIND_ADDR",
                value: v.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(v) = lookup("PENDING_JOB_LIMIT") {
            config.jobs.pending_job_limit = parse_u64("PENDING_JOB_LIMIT", &v)?;
        }
        if let Some(v) = lookup("OUTPUT_BUCKET") {
            config.jobs.output_bucket = non_empty("OUTPUT_BUCKET", v)?;
        }
        if let Some(v) = lookup("QUEUE_TOPIC") {
            config.jobs.topic = non_empty("QUEUE_TOPIC", v)?;
        }
        if let Some(v) = lookup("DOWNLOAD_URL_TEMPLATE") {
            config.jobs.download_url_template =
                DownloadUrlTemplate::new(non_empty("DOWNLOAD_URL_TEMPLATE", v)?);
        }
        if let Some(v) = lookup("JOB_TTL_SECS") {
            config.jobs.job_ttl = parse_secs("JOB_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("SUBMISSION_RETRY_SECS") {
            config.jobs.submission_retry = parse_secs("SUBMISSION_RETRY_SECS", &v)?;
        }
        if let Some(v) = lookup("FILE_RETENTION_SECS") {
            config.jobs.file_retention = parse_secs("FILE_RETENTION_SECS", &v)?;
        }
        if let Some(v) = lookup("SWEEP_INTERVAL_SECS") {
            let secs = parse_u64("SWEEP_INTERVAL_SECS", &v)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: "SWEEP_INTERVAL_SECS",
                    value: v,
                    reason: "must be at least 1".to_string(),
                });
            }
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("USE_PERSISTENT_STORES") {
            config.use_persistent_stores = parse_bool("USE_PERSISTENT_STORES", &v)?;
        }
        config.database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if let Some(v) = lookup("REDIS_URL") {
            config.redis_url = v;
        }
        if let Some(v) = lookup("OBJECT_STORE_ENDPOINT") {
            config.object_store_endpoint = v;
        }
        if let Some(id) = lookup("SEED_DATA_SET_ID") {
            config.seed_data_set = Some(parse_seed(
                &id,
                lookup("SEED_DATA_SET_URL"),
                lookup("SEED_DATA_SET_DIMENSIONS"),
            )?);
        }

        if config.use_persistent_stores && config.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        Ok(config)
    }
}

fn parse_u64(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Upper bound for any duration setting: ten years.
const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn parse_secs(var: &'static str, value: &str) -> Result<chrono::Duration, ConfigError> {
    let secs = parse_u64(var, value)?;
    if secs > MAX_DURATION_SECS {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: format!("must be at most {MAX_DURATION_SECS} seconds"),
        });
    }
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "out of range".to_string(),
        })
}

fn parse_seed(
    id: &str,
    input_url: Option<String>,
    dimensions: Option<String>,
) -> Result<DataSetSeed, ConfigError> {
    let id = id.trim().parse().map_err(|e: filterjob_core::DomainError| ConfigError::Invalid {
        var: "SEED_DATA_SET_ID",
        value: id.to_string(),
        reason: e.to_string(),
    })?;
    let input_url = non_empty(
        "SEED_DATA_SET_URL",
        input_url.ok_or(ConfigError::Missing("SEED_DATA_SET_URL"))?,
    )?;

    let mut parsed = CanonicalFilters::new();
    for entry in dimensions.iter().flat_map(|d| d.split(';')) {
        if entry.trim().is_empty() {
            continue;
        }
        let (dimension, values) = entry
            .split_once('=')
            .filter(|(dimension, _)| !dimension.trim().is_empty())
            .ok_or_else(|| ConfigError::Invalid {
                var: "SEED_DATA_SET_DIMENSIONS",
                value: entry.to_string(),
                reason: "expected dimension=value,value".to_string(),
            })?;
        parsed.insert(
            dimension.trim(),
            values.split(',').map(str::trim).filter(|v| !v.is_empty()),
        );
    }

    Ok(DataSetSeed {
        id,
        input_url,
        dimensions: parsed,
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn non_empty(var: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Invalid {
            var,
            value,
            reason: "must not be empty".to_string(),
        })
    } else {
        Ok(value)
    }
}
