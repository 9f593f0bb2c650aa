//! Key-value stores backing the allocation table
//!
//! The allocator only needs three things from a store: read a document,
//! replace a document atomically, and hold a named lock. Locks are RAII
//! guards, released when dropped.

mod file;
mod memory;

pub use file::{DEFAULT_POLL_INTERVAL, DEFAULT_STALE_AFTER, FileLock, FileStore};
pub use memory::MemoryStore;

use crate::error::{AllocError, Result};
use async_trait::async_trait;

/// Linearizable key-value store with named mutual-exclusion locks
#[async_trait]
pub trait Store: Send + Sync {
    /// Held lock; dropping it releases the lock
    type Guard: Send;

    /// Read the document stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the document stored under `key`
    ///
    /// Either the whole value becomes visible or nothing changes.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Wait until the lock called `name` is free and take it
    async fn lock(&self, name: &str) -> Result<Self::Guard>;
}

/// Turn a store key or lock name into a single path component
fn file_stem(name: &str) -> Result<String> {
    let stem = name.trim_matches('/').replace('/', "__");
    if stem.is_empty() || stem.starts_with('.') {
        return Err(AllocError::Store(format!("invalid key: {:?}", name)));
    }
    Ok(stem)
}
