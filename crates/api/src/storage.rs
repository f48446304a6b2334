//! Storage for uploaded document bytes.
//!
//! Files are addressed by an opaque key generated at upload time; the
//! original file name only lives in the database. [`LocalStorage`] keeps
//! them under `UPLOAD_DIR`.

use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Stored file not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist `bytes` and return the key to read them back with.
    async fn put(&self, extension: &str, bytes: &[u8]) -> Result<String, StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove a file. Missing files are not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Whether new uploads can be stored right now.
    async fn check(&self) -> Result<(), StorageError>;
}

/// Files on the local filesystem under a root directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

/// Keys are `<uuid>.<ext>`; anything with path separators is refused.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && !key.starts_with('.')
        && !key.contains("..")
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn put(&self, extension: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let key = format!("{}.{extension}", uuid::Uuid::now_v7());
        let path = self.path_for(&key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key = %key, size = bytes.len(), "Stored upload");
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn check(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let metadata = tokio::fs::metadata(&self.root).await?;
        if metadata.permissions().readonly() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "upload directory is read-only",
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn keys_with_path_segments_are_invalid() {
        assert!(is_valid_key("0190a5f2-7c1e-7abc-9def-0123456789ab.pdf"));
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key("a/b.pdf"));
        assert!(!is_valid_key(".hidden"));
        assert!(!is_valid_key(""));
    }

    #[tokio::test]
    async fn put_get_delete_cycle() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let storage = LocalStorage::new(dir.path());

        let key = storage.put("pdf", b"%PDF-1.7").await.unwrap();
        assert!(key.ends_with(".pdf"));
        assert!(dir.path().join(&key).is_file());
        assert_eq!(storage.get(&key).await.unwrap(), b"%PDF-1.7");

        storage.delete(&key).await.unwrap();
        assert_matches!(storage.get(&key).await, Err(StorageError::NotFound(_)));
        // Deleting twice is fine.
        storage.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn check_creates_missing_root() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path().join("uploads");
        let storage = LocalStorage::new(&root);

        storage.check().await.unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn traversal_key_is_rejected() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let storage = LocalStorage::new(dir.path());
        assert_matches!(
            storage.get("../secret").await,
            Err(StorageError::InvalidKey(_))
        );
    }
}
