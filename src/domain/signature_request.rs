use crate::error::WebhookError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVENT_PREFIX: &str = "signature_request.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureRequestRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YousignData {
    #[serde(default)]
    pub signature_request: Option<SignatureRequestRef>,
}

/// Accepts both the flat `{event, signature_request}` shape and the v3
/// `{event_id, event_name, data: {signature_request}}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YousignWebhook {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default, alias = "event_name")]
    pub event: Option<String>,
    #[serde(default)]
    pub event_time: Option<Value>,
    #[serde(default)]
    pub signature_request: Option<SignatureRequestRef>,
    #[serde(default)]
    pub data: Option<YousignData>,
}

impl YousignWebhook {
    pub fn parse(raw: &[u8]) -> Result<Self, WebhookError> {
        if crate::domain::event::is_blank(raw) {
            return Err(WebhookError::EmptyBody);
        }
        let body: YousignWebhook = serde_json::from_slice(raw)
            .map_err(|e| WebhookError::MalformedBody(format!("invalid yousign payload: {e}")))?;
        if body.event.is_none() {
            return Err(WebhookError::MalformedBody("missing event name".to_string()));
        }
        if body.request().is_none() {
            return Err(WebhookError::MalformedBody("missing signature_request.id".to_string()));
        }
        Ok(body)
    }

    pub fn request(&self) -> Option<&SignatureRequestRef> {
        self.signature_request
            .as_ref()
            .or_else(|| self.data.as_ref().and_then(|d| d.signature_request.as_ref()))
            .filter(|r| !r.id.is_empty())
    }

    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or_default()
    }

    /// `signature_request.done` → `done`
    pub fn action(&self) -> &str {
        let name = self.event_name();
        name.strip_prefix(EVENT_PREFIX).unwrap_or(name)
    }

    pub fn delivery_id(&self) -> String {
        match (&self.event_id, self.request()) {
            (Some(id), _) if !id.is_empty() => id.clone(),
            (_, Some(request)) => format!("{}:{}", self.event_name(), request.id),
            _ => self.event_name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_v3_envelope() {
        let raw = br#"{"event_id":"e-1","event_name":"signature_request.done","data":{"signature_request":{"id":"sr-1","status":"done"}}}"#;
        let hook = YousignWebhook::parse(raw).unwrap();
        assert_eq!(hook.action(), "done");
        assert_eq!(hook.request().map(|r| r.id.as_str()), Some("sr-1"));
        assert_eq!(hook.delivery_id(), "e-1");
    }

    #[test]
    fn reads_flat_shape() {
        let raw = br#"{"event":"signature_request.completed","signature_request":{"id":"sr-2"}}"#;
        let hook = YousignWebhook::parse(raw).unwrap();
        assert_eq!(hook.action(), "completed");
        assert_eq!(hook.delivery_id(), "signature_request.completed:sr-2");
    }

    #[test]
    fn requires_request_id() {
        let raw = br#"{"event":"signature_request.done"}"#;
        assert!(matches!(YousignWebhook::parse(raw), Err(WebhookError::MalformedBody(_))));
    }
}
