use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::storage::path::percent_encode;
use crate::storage::ObjectStore;

/// Object store backed by a directory on the local filesystem.
///
/// URLs follow the `{base}/b/{bucket}/o/{encoded key}?alt=media` download
/// layout so they normalize back to the object key.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn object_url(&self, path: &str) -> String {
        format!(
            "{}/b/{}/o/{}?alt=media",
            self.public_base_url,
            self.bucket,
            percent_encode(path)
        )
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        if path.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let relative = Path::new(path);
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(StorageError::InvalidPath(path.to_string())),
            }
        }
        if resolved == self.root {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let file = self.resolve(path)?;
        debug!("Reading object {} from {}", path, file.display());
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(source) => Err(StorageError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    async fn store(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let file = self.resolve(path)?;
        let io_error = |source| StorageError::Io {
            path: path.to_string(),
            source,
        };
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        debug!(
            "Writing object {} ({} bytes, {})",
            path,
            bytes.len(),
            content_type
        );
        tokio::fs::write(&file, bytes).await.map_err(io_error)?;
        Ok(self.object_url(path))
    }
}
