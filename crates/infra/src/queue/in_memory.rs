use std::sync::Mutex;

use async_trait::async_trait;

use filterjob_core::FilterRequest;

use super::{PublishError, WorkQueue};

/// A message captured by [`InMemoryWorkQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: String,
}

/// Records every publish; can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct InMemoryWorkQueue {
    published: Mutex<Vec<PublishedMessage>>,
    failing: Mutex<bool>,
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Published payloads decoded as filter requests; undecodable payloads are skipped.
    pub fn filter_requests(&self) -> Vec<FilterRequest> {
        self.published()
            .iter()
            .filter_map(|m| serde_json::from_str(&m.payload).ok())
            .collect()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(PublishError::Unavailable("broker unreachable".to_string()));
        }
        let mut published = self
            .published
            .lock()
            .map_err(|_| PublishError::Unavailable("lock poisoned".to_string()))?;
        published.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_until_failing() {
        let queue = InMemoryWorkQueue::new();
        queue.publish("filter-requests", "{}").await.unwrap();
        queue.set_failing(true);
        assert!(queue.publish("filter-requests", "{}").await.is_err());

        let published = queue.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "filter-requests");
    }
}
