use crate::repo::document_store::{
    merge_patch, stamp_server_fields, strip_server_fields, DocumentStore, CREATED_AT,
};
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

type Key = (String, String);

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    docs: Arc<RwLock<HashMap<Key, Map<String, Value>>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn key(collection: &str, id: &str) -> Key {
    (collection.to_string(), id.to_string())
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let docs = self.docs.read().await;
        Ok(docs.get(&key(collection, id)).cloned().map(Value::Object))
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        let mut map = strip_server_fields(doc)?;
        let mut docs = self.docs.write().await;
        let created_at = docs
            .get(&key(collection, id))
            .and_then(|existing| existing.get(CREATED_AT).cloned());
        stamp_server_fields(&mut map, created_at, chrono::Utc::now());
        docs.insert(key(collection, id), map);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create(&self, collection: &str, id: &str, doc: Value) -> Result<bool> {
        let mut map = strip_server_fields(doc)?;
        let mut docs = self.docs.write().await;
        let Entry::Vacant(slot) = docs.entry(key(collection, id)) else {
            return Ok(false);
        };
        stamp_server_fields(&mut map, None, chrono::Utc::now());
        slot.insert(map);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> Result<()> {
        let mut docs = self.docs.write().await;
        let Some(existing) = docs.get_mut(&key(collection, id)) else {
            anyhow::bail!("document {collection}/{id} not found");
        };
        let created_at = existing.get(CREATED_AT).cloned();
        merge_patch(existing, patch);
        stamp_server_fields(existing, created_at, chrono::Utc::now());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
