use crate::providers::{MetadataProvider, ResourceKind};
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Default)]
pub struct StaticMetadata {
    pub entries: HashMap<String, Value>,
    pub fail: bool,
}

impl StaticMetadata {
    pub fn with(mut self, resource_id: &str, metadata: Value) -> Self {
        self.entries.insert(resource_id.to_string(), metadata);
        self
    }
}

#[async_trait::async_trait]
impl MetadataProvider for StaticMetadata {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn metadata(&self, _kind: ResourceKind, resource_id: &str) -> Result<Option<Value>> {
        if self.fail {
            anyhow::bail!("static metadata lookup failure");
        }
        Ok(self.entries.get(resource_id).cloned())
    }
}
