//! Single-slot storage for submissions awaiting a manual retry

use crate::domain::PendingSubmission;
use crate::errors::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// File name of the slot inside the client data directory
pub const PENDING_FILE_NAME: &str = "pending_submission.json";

/// One saved submission at most; each save replaces the previous one
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn save(&self, pending: &PendingSubmission) -> Result<()>;
    async fn load(&self) -> Result<Option<PendingSubmission>>;
    async fn clear(&self) -> Result<()>;
}

/// JSON file on local disk
pub struct FilePendingStore {
    path: PathBuf,
}

impl FilePendingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Slot file inside `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir.into().join(PENDING_FILE_NAME))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl PendingStore for FilePendingStore {
    async fn save(&self, pending: &PendingSubmission) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(pending)?;
        // Readers never see a partially written slot
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Pending submission saved");
        Ok(())
    }

    async fn load(&self) -> Result<Option<PendingSubmission>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local slot
#[derive(Clone, Default)]
pub struct MemoryPendingStore {
    slot: Arc<RwLock<Option<PendingSubmission>>>,
}

impl MemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingStore for MemoryPendingStore {
    async fn save(&self, pending: &PendingSubmission) -> Result<()> {
        *self.slot.write().await = Some(pending.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<PendingSubmission>> {
        Ok(self.slot.read().await.clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PaperForm;

    fn pending(title: &str) -> PendingSubmission {
        PendingSubmission::new(
            PaperForm {
                title: title.into(),
                ..Default::default()
            },
            Some("draft.pdf".into()),
        )
    }

    #[tokio::test]
    async fn test_file_slot_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePendingStore::in_dir(dir.path().join("nested"));
        assert_eq!(store.load().await.unwrap(), None);

        store.save(&pending("first")).await.unwrap();
        let second = pending("second");
        store.save(&second).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(second));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        // clearing an empty slot is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_slot() {
        let store = MemoryPendingStore::new();
        store.save(&pending("only")).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().form.title, "only");
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
