//! JSON document store

use crate::lock::{LockFile, LockOptions};
use crate::StorageError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::sync::OwnedMutexGuard;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Exclusive access to one document; the lock file goes before the local mutex
struct DocumentGuard {
    _file: LockFile,
    _local: OwnedMutexGuard<()>,
}

/// Named JSON documents in one directory.
///
/// `write` replaces documents atomically; `update` additionally serializes
/// read-modify-write cycles per document, within the process through a
/// per-name mutex and across processes through a `<name>.lock` file.
#[derive(Debug)]
pub struct JsonStorage {
    data_dir: PathBuf,
    lock_options: LockOptions,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl JsonStorage {
    /// Store rooted at `data_dir` with default lock timing
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_options(data_dir, LockOptions::default())
    }

    pub fn with_options(data_dir: impl Into<PathBuf>, lock_options: LockOptions) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock_options,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Read and parse a document; `Ok(None)` when it does not exist
    pub async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        self.ensure_data_dir().await?;
        let path = self.document_path(name)?;

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Document {} not found, returning none", name);
                return Ok(None);
            }
            Err(source) => {
                tracing::error!("Error reading document {}: {}", name, source);
                return Err(StorageError::Io { path, source });
            }
        };

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|source| StorageError::Parse {
                name: name.to_string(),
                source,
            })
    }

    /// Serialize `value` and atomically replace the document
    pub async fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        self.ensure_data_dir().await?;
        let path = self.document_path(name)?;

        let json = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serialize {
            name: name.to_string(),
            source,
        })?;

        let temp_path = self.temp_path(name);
        if let Err(source) = Self::replace(&temp_path, &path, &json).await {
            tracing::error!("Error writing document {}: {}", name, source);
            if let Err(e) = tokio::fs::remove_file(&temp_path).await
                && e.kind() != ErrorKind::NotFound
            {
                tracing::debug!("Failed to clean up {}: {}", temp_path.display(), e);
            }
            return Err(StorageError::Io { path, source });
        }

        tracing::debug!("Wrote document {} ({} bytes)", name, json.len());
        Ok(())
    }

    /// Locked read-modify-write.
    ///
    /// `mutator` receives the current value (`None` when absent) and returns
    /// the new one, which is written and returned.
    pub async fn update<T, F>(&self, name: &str, mutator: F) -> Result<T, StorageError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> T,
    {
        let _guard = self.lock_document(name).await?;

        let current = self.read::<T>(name).await?;
        let updated = mutator(current);
        self.write(name, &updated).await?;
        Ok(updated)
    }

    /// Like [`update`](Self::update), but the document is left untouched when
    /// `mutator` returns `None`.
    pub async fn try_update<T, F>(&self, name: &str, mutator: F) -> Result<Option<T>, StorageError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> Option<T>,
    {
        let _guard = self.lock_document(name).await?;

        let current = self.read::<T>(name).await?;
        match mutator(current) {
            Some(updated) => {
                self.write(name, &updated).await?;
                Ok(Some(updated))
            }
            None => {
                tracing::debug!("Document {} unchanged", name);
                Ok(None)
            }
        }
    }

    async fn lock_document(&self, name: &str) -> Result<DocumentGuard, StorageError> {
        self.ensure_data_dir().await?;
        let lock_path = self.lock_path(name)?;

        let local = self.local_lock(name).lock_owned().await;
        let file = LockFile::acquire(&lock_path, name, &self.lock_options).await?;
        Ok(DocumentGuard {
            _file: file,
            _local: local,
        })
    }

    /// Remove a document; `Ok(false)` when there was nothing to remove
    pub async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        self.ensure_data_dir().await?;
        let path = self.document_path(name)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Deleted document {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Document {} not found, nothing to delete", name);
                Ok(false)
            }
            Err(source) => {
                tracing::error!("Error deleting document {}: {}", name, source);
                Err(StorageError::Io { path, source })
            }
        }
    }

    /// Does the document exist?
    pub async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.document_path(name)?;
        match tokio::fs::try_exists(&path).await {
            Ok(exists) => Ok(exists),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    async fn ensure_data_dir(&self) -> Result<(), StorageError> {
        if tokio::fs::try_exists(&self.data_dir).await.unwrap_or(false) {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.data_dir.clone(),
                source,
            })?;
        tracing::info!("Created data directory {}", self.data_dir.display());
        Ok(())
    }

    async fn replace(temp_path: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(temp_path, path).await
    }

    fn document_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.data_dir.join(name))
    }

    fn lock_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.data_dir.join(format!("{}.lock", name)))
    }

    /// Unique per writer so concurrent plain writes never share a temp file
    fn temp_path(&self, name: &str) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.data_dir
            .join(format!("{}.{}.{}.tmp", name, std::process::id(), n))
    }

    fn local_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(name.to_string()).or_default().clone()
    }
}

/// Document names are plain file names
pub fn validate_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.ends_with(".tmp")
        || name.ends_with(".lock");

    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
