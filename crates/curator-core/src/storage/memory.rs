//! In-process object store for tests and local experiments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ObjectStore, PutObject};
use crate::error::PipelineResult;

/// A stored object as the store received it.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

/// Keeps every object in a map and counts calls.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put_object` calls received, including overwrites.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, object: &PutObject) -> PipelineResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                object.key.clone(),
                StoredObject {
                    body: object.body.clone(),
                    content_type: object.content_type.clone(),
                    cache_control: object.cache_control.clone(),
                },
            );
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_counts_and_keeps_objects() {
        let store = MemoryStore::new();
        let object = PutObject {
            key: "b.jpg".to_string(),
            body: vec![9],
            content_type: "image/jpeg".to_string(),
            cache_control: "no-cache".to_string(),
        };
        store.put_object(&object).await.unwrap();
        store
            .put_object(&PutObject {
                key: "a.jpg".to_string(),
                ..object
            })
            .await
            .unwrap();

        assert_eq!(store.put_count(), 2);
        assert_eq!(store.keys(), vec!["a.jpg", "b.jpg"]);
        assert!(store.get("missing.jpg").is_none());
    }
}
