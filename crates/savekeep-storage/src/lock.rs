//! Cross-process document lock
//!
//! A held lock is a `<name>.lock` file carrying a stamp unique to its holder.
//! The holder touches the file periodically, so only a lock whose holder died
//! grows older than `stale_after`. Stale locks are moved aside before being
//! deleted, and a holder only removes a file still carrying its own stamp.

use crate::StorageError;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant, SystemTime};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

static LOCK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lock timing
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Fixed sleep between attempts while another holder has the lock
    pub retry_interval: Duration,
    /// Lock files untouched for this long are treated as left behind by a crash
    pub stale_after: Duration,
    /// Give up after this long; `None` waits until the lock frees or goes stale
    pub max_wait: Option<Duration>,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(100),
            stale_after: Duration::from_secs(30),
            max_wait: None,
        }
    }
}

impl LockOptions {
    /// How often a holder refreshes its lock file
    pub fn heartbeat_interval(&self) -> Duration {
        (self.stale_after / 3).max(Duration::from_millis(1))
    }
}

/// Held lock file, released on drop
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    stamp: String,
    heartbeat: Option<Sender<()>>,
}

impl LockFile {
    /// Create `path` exclusively, waiting while a live holder has it.
    ///
    /// A lock file whose modification time is older than
    /// `options.stale_after` is broken and the attempt repeated at once.
    pub async fn acquire(path: &Path, name: &str, options: &LockOptions) -> Result<Self, StorageError> {
        let started = Instant::now();

        loop {
            match OpenOptions::new().write(true).create_new(true).open(path).await {
                Ok(file) => return Self::hold(path, file, options).await,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(holder) = Self::stale_holder(path, options.stale_after).await {
                        Self::break_stale(path, &holder).await?;
                        continue;
                    }

                    if let Some(max_wait) = options.max_wait
                        && started.elapsed() >= max_wait
                    {
                        return Err(StorageError::LockTimeout {
                            name: name.to_string(),
                            waited: started.elapsed(),
                        });
                    }

                    tokio::time::sleep(options.retry_interval).await;
                }
                Err(source) => {
                    return Err(StorageError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
    }

    /// Stamp a freshly created lock file and start its heartbeat
    async fn hold(path: &Path, mut file: tokio::fs::File, options: &LockOptions) -> Result<Self, StorageError> {
        let stamp = format!(
            "{} {} {}\n",
            std::process::id(),
            LOCK_SEQ.fetch_add(1, Ordering::Relaxed),
            chrono::Utc::now().to_rfc3339()
        );

        let setup = async {
            file.write_all(stamp.as_bytes()).await?;
            file.flush().await?;
            Self::start_heartbeat(file.into_std().await, path, options.heartbeat_interval())
        };

        match setup.await {
            Ok(heartbeat) => Ok(Self {
                path: path.to_path_buf(),
                stamp,
                heartbeat: Some(heartbeat),
            }),
            Err(source) => {
                // Nobody else can own a file we just created
                if let Err(e) = tokio::fs::remove_file(path).await {
                    tracing::debug!("Failed to remove {}: {}", path.display(), e);
                }
                Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Touch the lock file every `interval` until the sender is dropped.
    ///
    /// A thread rather than a task, so a mutator blocking the runtime cannot
    /// starve it.
    fn start_heartbeat(file: File, path: &Path, interval: Duration) -> std::io::Result<Sender<()>> {
        let (stop, stopped) = mpsc::channel::<()>();
        let lock_path = path.display().to_string();

        std::thread::Builder::new()
            .name("savekeep-lock-heartbeat".to_string())
            .spawn(move || {
                while let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(interval) {
                    if let Err(e) = file.set_modified(SystemTime::now()) {
                        tracing::debug!("Failed to refresh lock {}: {}", lock_path, e);
                    }
                }
            })?;

        Ok(stop)
    }

    /// Contents of the lock file if it has not been touched for `stale_after`
    async fn stale_holder(path: &Path, stale_after: Duration) -> Option<String> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        let modified = metadata.modified().ok()?;
        let age = SystemTime::now().duration_since(modified).ok()?;
        if age <= stale_after {
            return None;
        }

        tokio::fs::read_to_string(path).await.ok()
    }

    /// Move the stale lock aside, then delete it.
    ///
    /// If another waiter replaced the lock between the staleness check and
    /// the rename, the moved file is not the one judged stale and is linked
    /// back into place.
    async fn break_stale(path: &Path, holder: &str) -> Result<(), StorageError> {
        let aside = path.with_extension(format!(
            "lock.{}-{}.stale",
            std::process::id(),
            LOCK_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        match tokio::fs::rename(path, &aside).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        let moved = tokio::fs::read_to_string(&aside).await.unwrap_or_default();
        if moved == holder {
            tracing::warn!("Breaking stale lock {} held by {}", path.display(), holder.trim());
        } else if let Err(e) = tokio::fs::hard_link(&aside, path).await {
            tracing::warn!("Failed to restore live lock {}: {}", path.display(), e);
        }

        if let Err(e) = tokio::fs::remove_file(&aside).await {
            tracing::debug!("Failed to remove {}: {}", aside.display(), e);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unique to this holder
    pub fn stamp(&self) -> &str {
        &self.stamp
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Disconnecting the channel ends the heartbeat
        self.heartbeat.take();

        match std::fs::read_to_string(&self.path) {
            Ok(current) if current == self.stamp => {
                if let Err(e) = std::fs::remove_file(&self.path)
                    && e.kind() != ErrorKind::NotFound
                {
                    tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
                }
            }
            Ok(_) => {
                tracing::warn!("Lock {} was taken over, leaving it in place", self.path.display());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to read lock {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fast() -> LockOptions {
        LockOptions {
            retry_interval: Duration::from_millis(10),
            stale_after: Duration::from_secs(30),
            max_wait: Some(Duration::from_millis(100)),
        }
    }

    #[tokio::test]
    async fn test_lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json.lock");

        let lock = LockFile::acquire(&path, "doc.json", &fast()).await.unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_held_lock_times_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json.lock");

        let _held = LockFile::acquire(&path, "doc.json", &fast()).await.unwrap();
        let err = LockFile::acquire(&path, "doc.json", &fast()).await.unwrap_err();
        assert!(matches!(err, StorageError::LockTimeout { .. }));
    }

    #[tokio::test]
    async fn test_stale_lock_is_broken() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json.lock");
        std::fs::write(&path, "4242 0 crashed\n").unwrap();

        let options = LockOptions {
            stale_after: Duration::from_millis(50),
            ..fast()
        };
        tokio::time::sleep(Duration::from_millis(120)).await;

        let lock = LockFile::acquire(&path, "doc.json", &options).await.unwrap();
        let contents = std::fs::read_to_string(lock.path()).unwrap();
        assert!(contents.starts_with(&std::process::id().to_string()));
        assert_eq!(contents, lock.stamp());

        // Nothing is left beside the lock
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_heartbeat_keeps_held_lock_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json.lock");
        let options = LockOptions {
            retry_interval: Duration::from_millis(5),
            stale_after: Duration::from_millis(90),
            max_wait: Some(Duration::from_millis(300)),
        };

        let held = LockFile::acquire(&path, "doc.json", &options).await.unwrap();
        // Several stale periods pass while the lock stays held
        let err = LockFile::acquire(&path, "doc.json", &options).await.unwrap_err();
        assert!(matches!(err, StorageError::LockTimeout { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), held.stamp());
    }

    #[tokio::test]
    async fn test_drop_leaves_foreign_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json.lock");

        let lock = LockFile::acquire(&path, "doc.json", &fast()).await.unwrap();
        std::fs::write(&path, "9999 7 someone else\n").unwrap();
        drop(lock);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "9999 7 someone else\n");
    }

    #[tokio::test]
    async fn test_break_stale_restores_replaced_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json.lock");
        // The lock judged stale was already replaced by a new holder
        std::fs::write(&path, "1 1 fresh holder\n").unwrap();

        LockFile::break_stale(&path, "1 0 dead holder\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1 1 fresh holder\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_heartbeat_interval() {
        let options = LockOptions {
            stale_after: Duration::from_secs(30),
            ..Default::default()
        };
        assert_eq!(options.heartbeat_interval(), Duration::from_secs(10));

        let options = LockOptions {
            stale_after: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(options.heartbeat_interval(), Duration::from_millis(1));
    }
}
