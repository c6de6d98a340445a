//! S3-compatible object store checked with plain HTTP `HEAD` requests.
//!
//! `HEAD {endpoint}/{bucket}/{key}`: 200 means present, 404 (or 403 on buckets
//! that hide missing keys) means absent, anything else is an error. Requests are
//! unauthenticated, so a 403 is logged at `warn`: on a private bucket it usually
//! means the endpoint is misconfigured and files will never be seen as complete.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use super::{ObjectStore, ObjectStoreError};

#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { client, endpoint }
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    #[instrument(skip(self), err)]
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ObjectStoreError> {
        let url = self.object_url(bucket, key);
        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "object lookup");
        if status == StatusCode::FORBIDDEN {
            warn!(%url, "object lookup forbidden; treating as absent, check bucket access");
        }
        presence_from_status(status, key)
    }
}

fn presence_from_status(status: StatusCode, key: &str) -> Result<bool, ObjectStoreError> {
    match status {
        s if s.is_success() => Ok(true),
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(false),
        other => Err(ObjectStoreError::UnexpectedStatus {
            status: other.as_u16(),
            key: key.to_string(),
        }),
    }
}
