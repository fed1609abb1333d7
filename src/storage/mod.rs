pub mod local;
#[cfg(test)]
pub(crate) mod memory;
pub mod path;

use async_trait::async_trait;

use crate::error::StorageError;

pub use local::LocalObjectStore;

/// Blob storage holding source documents and formatted artifacts.
///
/// Paths are bare object keys; callers run [`path::normalize`] first.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Writes `bytes` under `path` and returns a URL the caller can download
    /// the object from.
    async fn store(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}
