use crate::error::WebhookError;
use crate::lifecycle::state::ResourceEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderEvent {
    pub id: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub links: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ProviderEvent {
    pub fn classify(&self) -> ResourceEvent {
        ResourceEvent::classify(&self.resource_type, &self.action)
    }

    /// Key of the persisted record: the linked resource when the provider
    /// sent one, otherwise the event id.
    pub fn record_id(&self) -> String {
        let link_key = match self.resource_type.as_str() {
            "payments" => "payment",
            "mandates" => "mandate",
            "subscriptions" => "subscription",
            _ => return self.id.clone(),
        };

        self.links
            .get(link_key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }

    pub fn failure_cause(&self) -> Option<String> {
        self.details
            .as_ref()
            .and_then(|d| d.get("cause"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

pub fn is_blank(raw: &[u8]) -> bool {
    raw.iter().all(u8::is_ascii_whitespace)
}

pub fn parse_body(raw: &[u8]) -> Result<Vec<ProviderEvent>, WebhookError> {
    if is_blank(raw) {
        return Err(WebhookError::EmptyBody);
    }

    let body: Value = serde_json::from_slice(raw)
        .map_err(|e| WebhookError::MalformedBody(format!("invalid webhook payload: {e}")))?;

    // `{"events": [...]}` is a batch, anything else must be a single event
    let events = match body.get("events") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                ProviderEvent::deserialize(item).map_err(|e| WebhookError::MalformedBody(format!("events[{i}]: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(WebhookError::MalformedBody("events must be an array".to_string())),
        None => {
            let event = ProviderEvent::deserialize(&body)
                .map_err(|e| WebhookError::MalformedBody(format!("invalid event: {e}")))?;
            vec![event]
        }
    };
    if events.is_empty() {
        return Err(WebhookError::EmptyBody);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_batch_and_single_shapes() {
        let batch = br#"{"events":[{"id":"EV1","resource_type":"payments","action":"created"}]}"#;
        assert_eq!(parse_body(batch).unwrap().len(), 1);

        let single = br#"{"id":"EV2","resource_type":"mandates","action":"active","links":{"mandate":"MD1"}}"#;
        let events = parse_body(single).unwrap();
        assert_eq!(events[0].record_id(), "MD1");
    }

    #[test]
    fn rejects_blank_and_empty_batches() {
        assert!(matches!(parse_body(b""), Err(WebhookError::EmptyBody)));
        assert!(matches!(parse_body(b"  \n"), Err(WebhookError::EmptyBody)));
        assert!(matches!(parse_body(br#"{"events":[]}"#), Err(WebhookError::EmptyBody)));
        assert!(matches!(parse_body(b"{not json"), Err(WebhookError::MalformedBody(_))));
    }

    #[test]
    fn batch_errors_name_the_offending_event() {
        let raw = br#"{"events":[{"id":"EV1","action":"created"},{"resource_type":"payments"}]}"#;
        match parse_body(raw) {
            Err(WebhookError::MalformedBody(msg)) => assert!(msg.contains("events[1]"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn non_array_events_is_not_read_as_a_single_event() {
        let raw = br#"{"events":"x","id":"e1","resource_type":"payments","action":"created"}"#;
        match parse_body(raw) {
            Err(WebhookError::MalformedBody(msg)) => assert_eq!(msg, "events must be an array"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn record_id_falls_back_to_event_id() {
        let event: ProviderEvent =
            serde_json::from_str(r#"{"id":"p1","resource_type":"payments","action":"created"}"#).unwrap();
        assert_eq!(event.record_id(), "p1");

        let unknown: ProviderEvent = serde_json::from_str(
            r#"{"id":"EV9","resource_type":"refunds","action":"created","links":{"refund":"RF1"}}"#,
        )
        .unwrap();
        assert_eq!(unknown.record_id(), "EV9");
    }
}
