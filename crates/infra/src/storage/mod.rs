//! Object storage: existence checks and download URL materialisation.

use async_trait::async_trait;

pub mod http;
pub mod in_memory;

pub use http::HttpObjectStore;
pub use in_memory::InMemoryObjectStore;

/// Existence check against the bucket the filter workers write into.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ObjectStoreError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object store request failed: {0}")]
    Request(String),
    #[error("unexpected object store response {status} for {key}")]
    UnexpectedStatus { status: u16, key: String },
}

/// Placeholder replaced by the file name when building a download URL.
pub const FILENAME_PLACEHOLDER: &str = "{filename}";

/// Expands a file name into a fully-qualified download URL.
///
/// A template without the placeholder gets the file name appended, so a plain
/// base URL such as `https://cdn.example/files/` also works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadUrlTemplate(String);

impl DownloadUrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn expand(&self, file_name: &str) -> String {
        if self.0.contains(FILENAME_PLACEHOLDER) {
            self.0.replace(FILENAME_PLACEHOLDER, file_name)
        } else {
            format!("{}{}", self.0, file_name)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DownloadUrlTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
