use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const PAYMENT_UPDATE_PATH: &str = "/api/gocardless/payment-update";
pub const MANDATE_UPDATE_PATH: &str = "/api/gocardless/mandate-update";
pub const SIGNATURE_UPDATE_PATH: &str = "/api/yousign/signature-update";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusNotification {
    pub resource_id: String,
    pub status: String,
    pub payload: Value,
}

#[async_trait::async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, path: &str, notification: &StatusNotification) -> Result<()>;
}

#[derive(Clone)]
pub struct FrontendNotifier {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl FrontendNotifier {
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl StatusNotifier for FrontendNotifier {
    async fn notify(&self, path: &str, notification: &StatusNotification) -> Result<()> {
        self.client
            .post(self.url_for(path))
            .header("Content-Type", "application/json")
            .json(notification)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Keeps every notification it is handed; used by tests and local dry runs.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(String, StatusNotification)>>>,
}

impl RecordingNotifier {
    pub async fn sent(&self) -> Vec<(String, StatusNotification)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl StatusNotifier for RecordingNotifier {
    async fn notify(&self, path: &str, notification: &StatusNotification) -> Result<()> {
        self.sent
            .lock()
            .await
            .push((path.to_string(), notification.clone()));
        Ok(())
    }
}
