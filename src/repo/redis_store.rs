use crate::repo::document_store::{
    merge_patch, stamp_server_fields, strip_server_fields, DocumentStore, CREATED_AT,
};
use anyhow::Result;
use redis::AsyncCommands;
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct RedisDocumentStore {
    pub client: redis::Client,
}

impl RedisDocumentStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn doc_key(collection: &str, id: &str) -> String {
        format!("doc:{}:{}", collection, id)
    }

    async fn load(
        conn: &mut redis::aio::MultiplexedConnection,
        key: &str,
    ) -> Result<Option<Map<String, Value>>> {
        let payload: Option<String> = conn.get(key).await?;
        match payload {
            Some(payload) => match serde_json::from_str::<Value>(&payload)? {
                Value::Object(map) => Ok(Some(map)),
                _ => anyhow::bail!("stored document at {key} is not an object"),
            },
            None => Ok(None),
        }
    }
}

// Read-modify-write without WATCH: concurrent writers to one document resolve
// last-write-wins.
#[async_trait::async_trait]
impl DocumentStore for RedisDocumentStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::doc_key(collection, id);
        Ok(Self::load(&mut conn, &key).await?.map(Value::Object))
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        let mut map = strip_server_fields(doc)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::doc_key(collection, id);
        let created_at = Self::load(&mut conn, &key)
            .await?
            .and_then(|existing| existing.get(CREATED_AT).cloned());
        stamp_server_fields(&mut map, created_at, chrono::Utc::now());
        let payload = serde_json::to_string(&map)?;
        let _: () = conn.set(key, payload).await?;
        Ok(())
    }

    async fn create(&self, collection: &str, id: &str, doc: Value) -> Result<bool> {
        let mut map = strip_server_fields(doc)?;
        stamp_server_fields(&mut map, None, chrono::Utc::now());
        let payload = serde_json::to_string(&map)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let created: bool = conn.set_nx(Self::doc_key(collection, id), payload).await?;
        Ok(created)
    }

    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::doc_key(collection, id);
        let Some(mut existing) = Self::load(&mut conn, &key).await? else {
            anyhow::bail!("document {collection}/{id} not found");
        };
        let created_at = existing.get(CREATED_AT).cloned();
        merge_patch(&mut existing, patch);
        stamp_server_fields(&mut existing, created_at, chrono::Utc::now());
        let payload = serde_json::to_string(&existing)?;
        let _: () = conn.set(key, payload).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_collection() {
        assert_eq!(RedisDocumentStore::doc_key("payments", "PM1"), "doc:payments:PM1");
        assert_eq!(
            RedisDocumentStore::doc_key("signature_requests", "sr-1"),
            "doc:signature_requests:sr-1"
        );
    }
}
