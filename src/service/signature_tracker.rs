use crate::domain::record::EventRecord;
use crate::domain::signature_request::YousignWebhook;
use crate::error::WebhookError;
use crate::lifecycle::state::{LifecycleAction, SignatureAction, SIGNATURE_REQUESTS};
use crate::lifecycle::transitions::{apply_action, apply_unrecognized, unrecognized_key, EventContext};
use crate::repo::DocumentStore;
use crate::service::frontend_notifier::{StatusNotification, StatusNotifier, SIGNATURE_UPDATE_PATH};
use crate::service::record_writer::{load_record, persist};
use crate::service::webhook_receiver::EventResult;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Applies YouSign signature-request webhooks to `signature_requests/<id>`.
#[derive(Clone)]
pub struct SignatureTracker {
    pub store: Arc<dyn DocumentStore>,
    pub notifier: Arc<dyn StatusNotifier>,
    pub notify_timeout: Duration,
}

impl SignatureTracker {
    pub async fn apply(&self, hook: &YousignWebhook) -> Result<EventResult, WebhookError> {
        let request_id = hook
            .request()
            .map(|r| r.id.clone())
            .ok_or_else(|| WebhookError::MalformedBody("missing signature_request.id".to_string()))?;
        let delivery_id = hook.delivery_id();

        let action = SignatureAction::parse(hook.action());
        if action.is_none() {
            tracing::warn!(event = hook.event_name(), request_id = %request_id, "unrecognized yousign event");
        }

        let mut replayed = false;
        let (key, transition) = loop {
            let existing = self.load(&request_id).await?;
            let now = chrono::Utc::now();
            let (key, transition) = match action {
                Some(action) => {
                    let transition = apply_action(existing, action, &self.context(hook, &request_id, &delivery_id), now);
                    (request_id.clone(), transition)
                }
                None => {
                    let key = unrecognized_key(existing.as_ref(), &request_id, &delivery_id).to_string();
                    let existing = if key == request_id { existing } else { self.load(&key).await? };
                    let transition = apply_unrecognized(existing, &self.context(hook, &key, &delivery_id), now);
                    (key, transition)
                }
            };
            match persist(self.store.as_ref(), SIGNATURE_REQUESTS, &transition).await {
                Ok(true) => break (key, transition),
                Ok(false) if !replayed => {
                    tracing::info!(request_id = %key, "signature request created concurrently, reapplying");
                    replayed = true;
                }
                Ok(false) => {
                    return Err(WebhookError::Persistence(format!(
                        "{SIGNATURE_REQUESTS}/{key} keeps being created concurrently"
                    )));
                }
                Err(err) => return Err(WebhookError::persistence(err)),
            }
        };
        tracing::info!(
            request_id = %key,
            status = %transition.record.status,
            outcome = ?transition.kind,
            "signature request processed"
        );

        if transition.kind.changes_status() && action.is_some_and(|a| a.notifies()) {
            let notification = StatusNotification {
                resource_id: request_id.clone(),
                status: transition.record.status.clone(),
                payload: json!({
                    "eventId": delivery_id,
                    "event": hook.event_name(),
                    "eventTime": hook.event_time,
                }),
            };
            let sent = tokio::time::timeout(
                self.notify_timeout,
                self.notifier.notify(SIGNATURE_UPDATE_PATH, &notification),
            )
            .await;
            match sent {
                Ok(Ok(())) => tracing::info!(request_id = %request_id, "frontend notified"),
                Ok(Err(err)) => tracing::warn!(request_id = %request_id, "frontend notification failed: {:#}", err),
                Err(_) => tracing::warn!(request_id = %request_id, "frontend notification timed out"),
            }
        }

        Ok(EventResult {
            event_id: delivery_id,
            record_id: key,
            status: transition.record.status.clone(),
            outcome: transition.kind,
        })
    }

    async fn load(&self, id: &str) -> Result<Option<EventRecord>, WebhookError> {
        load_record(self.store.as_ref(), SIGNATURE_REQUESTS, id)
            .await
            .map_err(WebhookError::persistence)
    }

    fn context<'a>(&self, hook: &'a YousignWebhook, record_id: &'a str, delivery_id: &'a str) -> EventContext<'a> {
        EventContext {
            record_id,
            resource_type: SIGNATURE_REQUESTS,
            action: hook.action(),
            event_id: delivery_id,
            failure_reason: None,
        }
    }
}
