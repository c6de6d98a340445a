//! Redis pub/sub publisher (optional).
//!
//! Pub/sub is not durable: a message published while no worker is subscribed is
//! lost. The dispatcher's retry window re-submits such files on a later check.

use async_trait::async_trait;
use redis::Commands;
use tracing::debug;

use super::{PublishError, WorkQueue};

#[derive(Debug, Clone)]
pub struct RedisPubSubWorkQueue {
    client: redis::Client,
}

impl RedisPubSubWorkQueue {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, PublishError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| PublishError::Unavailable(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WorkQueue for RedisPubSubWorkQueue {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        let client = self.client.clone();
        let channel = topic.to_string();
        let payload = payload.to_string();

        // The sync client blocks; keep it off the async workers.
        let receivers = tokio::task::spawn_blocking(move || -> Result<i64, PublishError> {
            let mut conn = client
                .get_connection()
                .map_err(|e| PublishError::Unavailable(e.to_string()))?;
            conn.publish(&channel, payload)
                .map_err(|e| PublishError::Unavailable(e.to_string()))
        })
        .await
        .map_err(|e| PublishError::Unavailable(format!("publish task failed: {}", e)))??;

        debug!(topic, receivers, "published filter request");
        Ok(())
    }
}
