use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::storage::ObjectStore;

/// Test double keeping objects in a map.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, path: &str, bytes: Vec<u8>) {
        self.objects.lock().await.insert(path.to_string(), bytes);
    }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(path).cloned()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.get(path)
            .await
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn store(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.insert(path, bytes).await;
        Ok(format!("memory://{}", path))
    }
}
