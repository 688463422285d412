use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use super::{ImageStore, StorageError};

/// Writes each image to `<base>/<id>.png`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    base: PathBuf,
}

impl LocalImageStore {
    /// Open the store, creating the base directory if needed.
    pub async fn open(base: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base = base.into();
        tokio::fs::create_dir_all(&base).await?;
        info!(path = %base.display(), "image storage ready");
        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StorageError> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !safe {
            return Err(StorageError::InvalidId(id.to_owned()));
        }
        Ok(self.base.join(format!("{id}.png")))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, id: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let path = self.path_for(id)?;
        tokio::fs::write(&path, bytes).await?;
        let path = path.display().to_string();
        info!(id, path = %path, bytes = bytes.len(), "image saved");
        Ok(path)
    }

    async fn load(&self, id: &str) -> Result<Bytes, StorageError> {
        let path = self.path_for(id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(id.to_owned())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(id, "image deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: &str) -> bool {
        match self.path_for(id) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::open(dir.path().join("nested")).await.unwrap();

        let path = store.save("img_abc", b"0123456789").await.unwrap();
        assert!(path.ends_with("img_abc.png"));
        assert!(store.exists("img_abc").await);
        assert_eq!(store.load("img_abc").await.unwrap().as_ref(), b"0123456789");

        assert!(store.delete("img_abc").await.unwrap());
        assert!(!store.delete("img_abc").await.unwrap());
        assert!(matches!(
            store.load("img_abc").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn traversal_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::open(dir.path()).await.unwrap();
        for id in ["../escape", "a/b", "", "img.png"] {
            assert!(matches!(
                store.save(id, b"x").await,
                Err(StorageError::InvalidId(_))
            ));
        }
        assert!(!store.exists("../escape").await);
    }
}
