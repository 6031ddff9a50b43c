//! In-process object store, used to drive the engine without a network

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

use crate::store::{ObjectMeta, ObjectStore, StoreError, StoreResult};

enum Entry {
    Object(Bytes),
    Broken(String),
}

/// Map-backed store. Existence-waits wake up as soon as a matching `put` lands.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    changed: Notify,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.insert(key.into(), Entry::Object(body.into()));
    }

    /// Make every request for `key` fail with a backend error.
    pub fn fail(&self, key: impl Into<String>, message: impl Into<String>) {
        self.insert(key.into(), Entry::Broken(message.into()));
    }

    pub fn contains(&self, key: &str) -> bool {
        matches!(
            self.entries.lock().unwrap().get(key),
            Some(Entry::Object(_))
        )
    }

    fn insert(&self, key: String, entry: Entry) {
        self.entries.lock().unwrap().insert(key, entry);
        self.changed.notify_waiters();
    }

    fn lookup(&self, key: &str) -> StoreResult<Bytes> {
        match self.entries.lock().unwrap().get(key) {
            Some(Entry::Object(body)) => Ok(body.clone()),
            Some(Entry::Broken(message)) => Err(StoreError::backend(message.clone())),
            None => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn wait_for_existence(&self, key: &str, timeout: Duration) -> StoreResult<ObjectMeta> {
        let wait = async {
            loop {
                // Register interest before looking so a concurrent put is never missed.
                let notified = self.changed.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                match self.lookup(key) {
                    Ok(body) => {
                        return Ok(ObjectMeta {
                            size: body.len() as u64,
                        })
                    }
                    Err(StoreError::NotFound) => {}
                    Err(e) => return Err(e),
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or(Err(StoreError::WaitTimeout(timeout)))
    }

    async fn get_object(&self, key: &str) -> StoreResult<Bytes> {
        self.lookup(key)
    }

    async fn head_object(&self, key: &str) -> StoreResult<ObjectMeta> {
        self.lookup(key).map(|body| ObjectMeta {
            size: body.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn wait_wakes_on_put() {
        let store = Arc::new(MemoryStore::new());
        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            writer.put("job.ok", "");
        });

        let meta = store
            .wait_for_existence("job.ok", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(meta.size, 0);
        assert!(store.contains("job.ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out() {
        let store = MemoryStore::new();
        let result = store
            .wait_for_existence("job.ok", Duration::from_secs(10))
            .await;
        assert!(matches!(result, Err(StoreError::WaitTimeout(_))));
    }

    #[tokio::test]
    async fn broken_keys_fail_every_operation() {
        let store = MemoryStore::new();
        store.fail("job.error", "permission denied");

        assert!(matches!(
            store.get_object("job.error").await,
            Err(StoreError::Backend(_))
        ));
        assert!(matches!(
            store.wait_for_existence("job.error", Duration::from_secs(1)).await,
            Err(StoreError::Backend(_))
        ));
        assert!(matches!(
            store.head_object("missing").await,
            Err(StoreError::NotFound)
        ));
    }
}
