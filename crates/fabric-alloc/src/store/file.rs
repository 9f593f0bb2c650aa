//! Directory-backed store
//!
//! Each document lives in `<root>/<key>.json`; each lock is a
//! `<root>/<name>.lock` file created exclusively by its holder. Any number
//! of processes sharing the directory see one consistent table.

use super::{Store, file_stem};
use crate::error::{AllocError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const DOCUMENT_EXT: &str = "json";
const LOCK_EXT: &str = "lock";

static LOCK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Locks older than this are considered abandoned by a crashed holder
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// How often a waiter re-checks a held lock
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Store keeping documents and locks as files in one directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    stale_after: Duration,
    poll_interval: Duration,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            stale_after: DEFAULT_STALE_AFTER,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join(format!("{}.{}", file_stem(key)?, DOCUMENT_EXT)))
    }

    fn lock_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(format!("{}.{}", file_stem(name)?, LOCK_EXT)))
    }

    async fn ensure_root(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).await?;
            tracing::debug!("Created store directory: {}", self.root.display());
        }
        Ok(())
    }

    /// Try to create the lock file; `None` when someone else holds it
    async fn try_lock(&self, path: &Path) -> Result<Option<FileLock>> {
        let info = LockInfo::new();
        let content = serde_json::to_string_pretty(&info)?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // A half-written file carries no token a guard could match
            let _ = fs::remove_file(path).await;
            return Err(AllocError::LockError(format!(
                "failed to write {}: {}",
                path.display(),
                e
            )));
        }

        Ok(Some(FileLock {
            path: path.to_path_buf(),
            token: info.token,
        }))
    }

    /// Remove the lock at `path` if its holder has held it for too long
    ///
    /// Returns whether a stale lock was removed.
    async fn reclaim_if_stale(&self, path: &Path) -> Result<bool> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let info = serde_json::from_str::<LockInfo>(&content).ok();
        let age = match &info {
            Some(info) => (Utc::now() - info.acquired_at).to_std().unwrap_or_default(),
            // Holder may still be writing its info; fall back to the file age
            None => match fs::metadata(path).await {
                Ok(meta) => meta
                    .modified()
                    .ok()
                    .and_then(|t| t.elapsed().ok())
                    .unwrap_or_default(),
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(e.into()),
            },
        };

        if age < self.stale_after {
            return Ok(false);
        }

        // Only remove the lock we judged stale, not one taken since
        if fs::read_to_string(path).await.ok().as_deref() != Some(content.as_str()) {
            return Ok(false);
        }

        let holder = info.map(|i| i.holder).unwrap_or_else(|| "unknown".to_string());
        tracing::warn!(
            "Removing stale lock {} held by {} for {}s",
            path.display(),
            holder,
            age.as_secs()
        );

        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Store for FileStore {
    type Guard = FileLock;

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.document_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => {
                tracing::debug!("Read {} bytes from {}", content.len(), path.display());
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Document {} not found", path.display());
                Ok(None)
            }
            Err(e) => Err(AllocError::Store(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_root().await?;

        let path = self.document_path(key)?;
        let tmp = path.with_extension(format!("{}.tmp", DOCUMENT_EXT));
        let backup = path.with_extension(format!("{}.backup", DOCUMENT_EXT));

        let write = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(value.as_bytes()).await?;
            file.sync_all().await?;

            if fs::try_exists(&path).await? {
                fs::copy(&path, &backup).await?;
            }

            // rename is atomic, readers see the old or the new document
            fs::rename(&tmp, &path).await
        };

        write.await.map_err(|e| {
            AllocError::Store(format!("failed to write {}: {}", path.display(), e))
        })?;

        tracing::debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    async fn lock(&self, name: &str) -> Result<Self::Guard> {
        self.ensure_root().await?;
        let path = self.lock_path(name)?;

        loop {
            if let Some(lock) = self.try_lock(&path).await? {
                tracing::debug!("Acquired lock {}", path.display());
                return Ok(lock);
            }

            if !self.reclaim_if_stale(&path).await? {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }
}

/// Contents of a lock file
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    token: String,
    acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn new() -> Self {
        let host = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or_else(|_| "unknown".to_string());
        let now = Utc::now();
        let pid = std::process::id();

        Self {
            holder: format!("{}:{}", host, pid),
            token: format!(
                "{}-{}-{}",
                pid,
                now.timestamp_nanos_opt().unwrap_or_default(),
                LOCK_SEQ.fetch_add(1, Ordering::Relaxed)
            ),
            acquired_at: now,
        }
    }
}

/// RAII guard for a lock file
///
/// The lock file is removed on drop, unless it was reclaimed as stale and
/// now belongs to someone else.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    token: String,
}

impl FileLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let still_ours = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str::<LockInfo>(&content).ok())
            .is_some_and(|info| info.token == self.token);

        if still_ours {
            // Drop can't be async; a blocking unlink is fine here
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
            } else {
                tracing::debug!("Released lock {}", self.path.display());
            }
        }
    }
}
