//! In-process store

use super::Store;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Store held in process memory
///
/// Clones share the same documents and locks, so several allocators built
/// from clones of one `MemoryStore` behave like separate processes talking
/// to one shared store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    documents: Mutex<HashMap<String, String>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Guard = OwnedMutexGuard<()>;

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.documents.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .documents
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn lock(&self, name: &str) -> Result<Self::Guard> {
        let lock = self
            .inner
            .locks
            .lock()
            .await
            .entry(name.to_string())
            .or_default()
            .clone();

        tracing::debug!("Waiting for lock {}", name);
        Ok(lock.lock_owned().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_put() {
        let store = MemoryStore::new();
        assert_eq!(store.get("/key").await.unwrap(), None);

        store.put("/key", "{}").await.unwrap();
        assert_eq!(store.get("/key").await.unwrap().as_deref(), Some("{}"));

        store.put("/key", "[]").await.unwrap();
        assert_eq!(store.get("/key").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_clones_share_documents() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.put("/key", "value").await.unwrap();
        assert_eq!(other.get("/key").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_dropped() {
        let store = MemoryStore::new();
        let guard = store.lock("table").await.unwrap();

        let other = store.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.lock("table").await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_locks_are_independent_by_name() {
        let store = MemoryStore::new();
        let _a = store.lock("a").await.unwrap();
        let _b = tokio::time::timeout(Duration::from_secs(1), store.lock("b"))
            .await
            .unwrap()
            .unwrap();
    }
}
