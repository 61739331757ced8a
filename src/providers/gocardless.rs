use crate::providers::{MetadataProvider, ResourceKind};
use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

pub const LIVE_API_URL: &str = "https://api.gocardless.com";
pub const SANDBOX_API_URL: &str = "https://api-sandbox.gocardless.com";
pub const API_VERSION: &str = "2015-07-06";

pub fn api_url_for_token(access_token: &str) -> &'static str {
    if access_token.starts_with("live_") {
        LIVE_API_URL
    } else {
        SANDBOX_API_URL
    }
}

pub struct GoCardlessClient {
    pub base_url: String,
    pub access_token: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl GoCardlessClient {
    pub fn new(access_token: String, timeout_ms: u64, client: reqwest::Client) -> Self {
        Self {
            base_url: api_url_for_token(&access_token).to_string(),
            access_token,
            timeout_ms,
            client,
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for GoCardlessClient {
    fn name(&self) -> &'static str {
        "gocardless"
    }

    async fn metadata(&self, kind: ResourceKind, resource_id: &str) -> Result<Option<Value>> {
        let url = format!("{}/{}/{}", self.base_url, kind.path_segment(), resource_id);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("GoCardless-Version", API_VERSION)
            .header("Content-Type", "application/json")
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "gocardless {} lookup failed: HTTP {}: {}",
                kind.path_segment(),
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            );
        }

        let body: Value = resp.json().await?;
        Ok(extract_metadata(&body, kind))
    }
}

/// `{"payments": {"metadata": {...}}}` → `{...}`
pub fn extract_metadata(body: &Value, kind: ResourceKind) -> Option<Value> {
    body.get(kind.path_segment())
        .and_then(|resource| resource.get("metadata"))
        .filter(|m| m.is_object())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_api_by_token_prefix() {
        assert_eq!(api_url_for_token("live_abc"), LIVE_API_URL);
        assert_eq!(api_url_for_token("sandbox_abc"), SANDBOX_API_URL);
    }

    #[test]
    fn extracts_resource_metadata() {
        let body = json!({"payments": {"id": "PM1", "metadata": {"maintenanceId": "m-42"}}});
        assert_eq!(
            extract_metadata(&body, ResourceKind::Payment),
            Some(json!({"maintenanceId": "m-42"}))
        );
        assert_eq!(extract_metadata(&body, ResourceKind::Mandate), None);
    }
}
