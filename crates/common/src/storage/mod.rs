//! Object storage for uploaded paper files
//!
//! One port, [`ObjectStorage`], with an adapter over the `object_store`
//! crate covering memory, local filesystem and S3 backends.

use crate::config::{StorageBackend, StorageConfig};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use tracing::{debug, info};

/// Content type of every accepted upload
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Prefix under which uploads are stored
pub const UPLOAD_PREFIX: &str = "papers";

/// A stored file and its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// File storage port
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, path: &str, contents: Vec<u8>, content_type: &str) -> Result<()>;

    /// `Ok(None)` when nothing is stored at `path`
    async fn download(&self, path: &str) -> Result<Option<StoredObject>>;

    async fn delete(&self, path: &str) -> Result<()>;
}

/// `papers/{unix_millis}_{file_name}`, with any directory part of the
/// name dropped
pub fn generate_object_path(file_name: &str, now: DateTime<Utc>) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("upload.pdf");
    format!("{}/{}_{}", UPLOAD_PREFIX, now.timestamp_millis(), base)
}

fn content_type_from_extension(path: &str) -> &'static str {
    if path.to_lowercase().ends_with(".pdf") {
        PDF_CONTENT_TYPE
    } else {
        FALLBACK_CONTENT_TYPE
    }
}

/// [`ObjectStorage`] over any `object_store` backend
#[derive(Clone)]
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    /// Whether the backend keeps object attributes such as content type
    supports_attributes: bool,
}

impl ObjectStoreBackend {
    pub fn new(store: Arc<dyn ObjectStore>, supports_attributes: bool) -> Self {
        Self {
            store,
            supports_attributes,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), true)
    }

    /// Build the backend selected in configuration
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let backend = match config.backend {
            StorageBackend::Memory => Self::in_memory(),
            StorageBackend::Local => {
                std::fs::create_dir_all(&config.root)?;
                let store = LocalFileSystem::new_with_prefix(&config.root)?;
                Self::new(Arc::new(store), false)
            }
            StorageBackend::S3 => {
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(&config.bucket)
                    .build()?;
                Self::new(Arc::new(store), true)
            }
        };
        info!(backend = ?config.backend, "Object storage ready");
        Ok(backend)
    }
}

#[async_trait]
impl ObjectStorage for ObjectStoreBackend {
    async fn upload(&self, path: &str, contents: Vec<u8>, content_type: &str) -> Result<()> {
        let location = Path::from(path);
        let mut opts = PutOptions::default();
        if self.supports_attributes {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            opts.attributes = attributes;
        }

        let size = contents.len();
        self.store
            .put_opts(&location, PutPayload::from(contents), opts)
            .await?;
        debug!(path, size, "Object stored");
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Option<StoredObject>> {
        let location = Path::from(path);
        let result = match self.store.get(&location).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| {
                let value: &str = value.as_ref();
                value.to_string()
            })
            .unwrap_or_else(|| content_type_from_extension(path).to_string());
        let bytes = result.bytes().await?.to_vec();

        Ok(Some(StoredObject {
            bytes,
            content_type,
        }))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match self.store.delete(&Path::from(path)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(AppError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_object_path() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            generate_object_path("thesis.pdf", now),
            "papers/1700000000123_thesis.pdf"
        );
        assert_eq!(
            generate_object_path("C:\\Users\\ama\\final.pdf", now),
            "papers/1700000000123_final.pdf"
        );
    }

    #[tokio::test]
    async fn test_memory_round_trip_keeps_content_type() {
        let storage = ObjectStoreBackend::in_memory();
        storage
            .upload("papers/1_a.pdf", b"%PDF-1.7".to_vec(), PDF_CONTENT_TYPE)
            .await
            .unwrap();

        let stored = storage.download("papers/1_a.pdf").await.unwrap().unwrap();
        assert_eq!(stored.bytes, b"%PDF-1.7");
        assert_eq!(stored.content_type, PDF_CONTENT_TYPE);

        storage.delete("papers/1_a.pdf").await.unwrap();
        assert!(storage.download("papers/1_a.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stored_type_is_reported_as_is() {
        let storage = ObjectStoreBackend::in_memory();
        storage
            .upload("papers/2_b.pdf", b"<html>".to_vec(), "text/html")
            .await
            .unwrap();
        let stored = storage.download("papers/2_b.pdf").await.unwrap().unwrap();
        assert_eq!(stored.content_type, "text/html");
    }

    #[tokio::test]
    async fn test_local_backend_guesses_type() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Local,
            root: dir.path().to_string_lossy().into_owned(),
            bucket: String::new(),
        };
        let storage = ObjectStoreBackend::from_config(&config).unwrap();
        storage
            .upload("papers/3_c.pdf", b"%PDF".to_vec(), PDF_CONTENT_TYPE)
            .await
            .unwrap();
        let stored = storage.download("papers/3_c.pdf").await.unwrap().unwrap();
        assert_eq!(stored.content_type, PDF_CONTENT_TYPE);
        assert!(storage.download("papers/missing.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let storage = ObjectStoreBackend::in_memory();
        assert!(storage.delete("papers/none.pdf").await.is_ok());
    }
}
