use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Collection/document addressed JSON store.
///
/// `set` replaces the whole document; `create` inserts only when the id is
/// free and reports whether it did; `update` shallow-merges top-level keys
/// into an existing document and fails when the document is missing. All
/// three assign `createdAt`/`updatedAt` server side.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<()>;

    async fn create(&self, collection: &str, id: &str, doc: Value) -> Result<bool>;

    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

pub(crate) fn strip_server_fields(doc: Value) -> Result<Map<String, Value>> {
    match doc {
        Value::Object(mut map) => {
            map.remove(CREATED_AT);
            map.remove(UPDATED_AT);
            Ok(map)
        }
        other => anyhow::bail!("document must be a JSON object, got {}", type_name(&other)),
    }
}

pub(crate) fn stamp_server_fields(
    map: &mut Map<String, Value>,
    created_at: Option<Value>,
    now: DateTime<Utc>,
) {
    let now = Value::String(now.to_rfc3339());
    map.insert(CREATED_AT.to_string(), created_at.unwrap_or_else(|| now.clone()));
    map.insert(UPDATED_AT.to_string(), now);
}

pub(crate) fn merge_patch(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if key == CREATED_AT || key == UPDATED_AT {
            continue;
        }
        target.insert(key, value);
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
