//! Registry persistence
//!
//! Registries persist as versioned JSON documents in a `.storage/`
//! directory under the config dir. Writes go through a sibling temp
//! file and a rename so a crash never leaves a half-written document.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Versioned envelope wrapping every stored document
///
/// The major version bumps on breaking layout changes; the minor
/// version tracks migrations within a major version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    pub version: u32,
    pub minor_version: u32,
    /// Document key, doubling as the file name
    pub key: String,
    pub data: T,
}

impl<T> StorageFile<T> {
    pub fn new(key: impl Into<String>, data: T, version: u32, minor_version: u32) -> Self {
        Self {
            version,
            minor_version,
            key: key.into(),
            data,
        }
    }
}

/// Handle on one `.storage/` directory
#[derive(Debug, Clone)]
pub struct Storage {
    storage_dir: PathBuf,
}

impl Storage {
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: config_dir.as_ref().join(".storage"),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.storage_dir.join(key)
    }

    pub async fn exists(&self, key: &str) -> bool {
        fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    /// Load a document; None when it was never written
    pub async fn load<T>(&self, key: &str) -> StorageResult<Option<StorageFile<T>>>
    where
        T: DeserializeOwned,
    {
        let bytes = match fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(key, "No stored document");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let document: StorageFile<T> = serde_json::from_slice(&bytes)?;
        debug!(
            key,
            version = document.version,
            minor_version = document.minor_version,
            "Loaded stored document"
        );
        Ok(Some(document))
    }

    /// Write a document atomically, replacing any previous contents
    pub async fn save<T>(&self, document: &StorageFile<T>) -> StorageResult<()>
    where
        T: Serialize,
    {
        fs::create_dir_all(&self.storage_dir).await?;

        let content = serde_json::to_vec_pretty(document)?;
        let path = self.path_for(&document.key);
        let staging = self.path_for(&format!("{}.tmp", document.key));
        fs::write(&staging, &content).await?;
        fs::rename(&staging, &path).await?;

        debug!(
            key = %document.key,
            bytes = content.len(),
            "Wrote stored document"
        );
        Ok(())
    }
}

/// Document types that know their own key and version
pub trait Storable: Serialize + DeserializeOwned {
    const KEY: &'static str;
    const VERSION: u32;
    const MINOR_VERSION: u32;

    fn to_storage_file(&self) -> StorageFile<Self>
    where
        Self: Clone,
    {
        StorageFile::new(Self::KEY, self.clone(), Self::VERSION, Self::MINOR_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        value: i32,
    }

    impl Storable for Doc {
        const KEY: &'static str = "test.doc";
        const VERSION: u32 = 1;
        const MINOR_VERSION: u32 = 2;
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path());

        let doc = Doc {
            name: "porch".to_string(),
            value: 42,
        };
        storage.save(&doc.to_storage_file()).await.unwrap();
        assert!(storage.exists("test.doc").await);

        let loaded = storage.load::<Doc>("test.doc").await.unwrap().unwrap();
        assert_eq!(loaded.data, doc);
        assert_eq!((loaded.version, loaded.minor_version), (1, 2));
        assert_eq!(loaded.key, "test.doc");
    }

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path());

        assert!(storage.load::<Doc>("absent").await.unwrap().is_none());
        assert!(!storage.exists("absent").await);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_document() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path());

        for value in [1, 2] {
            let doc = Doc {
                name: "porch".to_string(),
                value,
            };
            storage.save(&doc.to_storage_file()).await.unwrap();
        }

        let loaded = storage.load::<Doc>("test.doc").await.unwrap().unwrap();
        assert_eq!(loaded.data.value, 2);
        // No staging file left behind
        assert!(!storage.exists("test.doc.tmp").await);
    }
}
