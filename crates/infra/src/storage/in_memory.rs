use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{ObjectStore, ObjectStoreError};

/// In-memory bucket listing for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashSet<(String, String)>>,
    unavailable: RwLock<bool>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a worker depositing a file.
    pub fn put(&self, bucket: impl Into<String>, key: impl Into<String>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert((bucket.into(), key.into()));
        }
    }

    /// Make every subsequent lookup fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut flag) = self.unavailable.write() {
            *flag = unavailable;
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ObjectStoreError> {
        if self.unavailable.read().map(|f| *f).unwrap_or(false) {
            return Err(ObjectStoreError::Request("object store unavailable".to_string()));
        }
        let objects = self
            .objects
            .read()
            .map_err(|_| ObjectStoreError::Request("lock poisoned".to_string()))?;
        Ok(objects.contains(&(bucket.to_string(), key.to_string())))
    }
}
