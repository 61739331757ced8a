use anyhow::Result;
use serde_json::Value;

pub mod gocardless;
pub mod mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Payment,
    Mandate,
}

impl ResourceKind {
    pub fn path_segment(self) -> &'static str {
        match self {
            ResourceKind::Payment => "payments",
            ResourceKind::Mandate => "mandates",
        }
    }
}

/// Looks up the `metadata` object the backend attached to a provider resource
/// at creation time (e.g. the `maintenanceId` the frontend correlates on).
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn metadata(&self, kind: ResourceKind, resource_id: &str) -> Result<Option<Value>>;
}
