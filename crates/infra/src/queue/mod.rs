//! Work queue used to hand filter requests to the external workers.

use async_trait::async_trait;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_pubsub;

pub use in_memory::InMemoryWorkQueue;
#[cfg(feature = "redis")]
pub use redis_pubsub::RedisPubSubWorkQueue;

/// Fire-and-forget publisher. Delivery guarantees belong to the broker.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),
}
