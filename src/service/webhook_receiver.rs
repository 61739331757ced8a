use crate::domain::event::ProviderEvent;
use crate::domain::record::EventRecord;
use crate::error::WebhookError;
use crate::lifecycle::state::ResourceEvent;
use crate::lifecycle::transitions::{
    apply_action, apply_unrecognized, unrecognized_key, EventContext, Transition, TransitionKind,
};
use crate::providers::{MetadataProvider, ResourceKind};
use crate::repo::DocumentStore;
use crate::service::frontend_notifier::{
    StatusNotification, StatusNotifier, MANDATE_UPDATE_PATH, PAYMENT_UPDATE_PATH,
};
use crate::service::record_writer::{load_record, persist};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventResult {
    pub event_id: String,
    pub record_id: String,
    pub status: String,
    pub outcome: TransitionKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchAck {
    pub received: bool,
    pub processed: usize,
    pub results: Vec<EventResult>,
}

#[derive(Clone)]
pub struct WebhookReceiver {
    pub store: Arc<dyn DocumentStore>,
    pub notifier: Arc<dyn StatusNotifier>,
    pub metadata: Option<Arc<dyn MetadataProvider>>,
    pub collection: String,
    pub notify_timeout: Duration,
}

impl WebhookReceiver {
    /// Applies events in order. The first persistence failure aborts the
    /// batch; events applied before it stay applied since redelivery is
    /// idempotent.
    pub async fn process_batch(&self, events: &[ProviderEvent]) -> Result<BatchAck, WebhookError> {
        let mut results = Vec::with_capacity(events.len());
        for event in events {
            tracing::info!(
                event_id = %event.id,
                resource_type = %event.resource_type,
                action = %event.action,
                "processing gocardless event"
            );
            results.push(self.apply_event(event).await?);
        }

        Ok(BatchAck {
            received: true,
            processed: results.len(),
            results,
        })
    }

    pub async fn apply_event(&self, event: &ProviderEvent) -> Result<EventResult, WebhookError> {
        let classified = event.classify();
        if classified == ResourceEvent::Unrecognized {
            tracing::warn!(
                event_id = %event.id,
                resource_type = %event.resource_type,
                action = %event.action,
                "unrecognized gocardless event"
            );
        }

        // a lost creation race is replayed once against the winning record
        let mut replayed = false;
        let (key, transition) = loop {
            let (key, transition) = self.transition_for(event, classified).await?;
            match persist(self.store.as_ref(), &self.collection, &transition).await {
                Ok(true) => break (key, transition),
                Ok(false) if !replayed => {
                    tracing::info!(event_id = %event.id, record_id = %key, "record created concurrently, reapplying");
                    replayed = true;
                }
                Ok(false) => {
                    return Err(WebhookError::Persistence(format!(
                        "{}/{} keeps being created concurrently",
                        self.collection, key
                    )));
                }
                Err(err) => {
                    tracing::error!(event_id = %event.id, record_id = %key, "persisting event failed: {:#}", err);
                    return Err(WebhookError::persistence(err));
                }
            }
        };
        log_transition(event, &transition);

        if transition.kind.changes_status() && classified.notifies() {
            self.notify(classified, event, &transition.record).await;
        }

        Ok(EventResult {
            event_id: event.id.clone(),
            record_id: key,
            status: transition.record.status.clone(),
            outcome: transition.kind,
        })
    }

    async fn load(&self, id: &str) -> Result<Option<EventRecord>, WebhookError> {
        load_record(self.store.as_ref(), &self.collection, id)
            .await
            .map_err(WebhookError::persistence)
    }

    async fn transition_for(
        &self,
        event: &ProviderEvent,
        classified: ResourceEvent,
    ) -> Result<(String, Transition), WebhookError> {
        let record_id = event.record_id();
        let failure_reason = event.failure_cause();
        let existing = self.load(&record_id).await?;
        let now = chrono::Utc::now();

        let transition = match classified {
            ResourceEvent::Payment(action) => {
                apply_action(existing, action, &context(event, &record_id, failure_reason.as_deref()), now)
            }
            ResourceEvent::Mandate(action) => {
                apply_action(existing, action, &context(event, &record_id, failure_reason.as_deref()), now)
            }
            ResourceEvent::Subscription(action) => {
                apply_action(existing, action, &context(event, &record_id, failure_reason.as_deref()), now)
            }
            ResourceEvent::Unrecognized => {
                let key = unrecognized_key(existing.as_ref(), &record_id, &event.id).to_string();
                let existing = if key == record_id { existing } else { self.load(&key).await? };
                let transition = apply_unrecognized(existing, &context(event, &key, None), now);
                return Ok((key, transition));
            }
        };
        Ok((record_id, transition))
    }

    async fn notify(&self, classified: ResourceEvent, event: &ProviderEvent, record: &EventRecord) {
        let (path, kind) = match classified {
            ResourceEvent::Payment(_) => (PAYMENT_UPDATE_PATH, ResourceKind::Payment),
            ResourceEvent::Mandate(_) => (MANDATE_UPDATE_PATH, ResourceKind::Mandate),
            ResourceEvent::Subscription(_) | ResourceEvent::Unrecognized => return,
        };

        let work = async {
            let mut payload = json!({
                "eventId": event.id,
                "resourceType": event.resource_type,
                "action": event.action,
                "links": event.links,
                "details": event.details,
                "createdAt": event.created_at,
            });
            if let Some(provider) = &self.metadata {
                match provider.metadata(kind, &record.id).await {
                    Ok(Some(metadata)) => {
                        payload["maintenanceId"] = metadata.get("maintenanceId").cloned().unwrap_or(Value::Null);
                        payload["metadata"] = metadata;
                    }
                    Ok(None) => {}
                    Err(err) => tracing::warn!(
                        provider = provider.name(),
                        record_id = %record.id,
                        "metadata lookup failed: {:#}",
                        err
                    ),
                }
            }

            payload["recordStatus"] = Value::String(record.status.clone());
            // the frontend keys its updates on the provider action
            let notification = StatusNotification {
                resource_id: record.id.clone(),
                status: record.action.clone(),
                payload,
            };
            self.notifier.notify(path, &notification).await
        };

        match tokio::time::timeout(self.notify_timeout, work).await {
            Ok(Ok(())) => tracing::info!(record_id = %record.id, status = %record.status, path, "frontend notified"),
            Ok(Err(err)) => tracing::warn!(record_id = %record.id, path, "frontend notification failed: {:#}", err),
            Err(_) => tracing::warn!(
                record_id = %record.id,
                path,
                timeout_ms = self.notify_timeout.as_millis() as u64,
                "frontend notification timed out"
            ),
        }
    }
}

fn context<'a>(event: &'a ProviderEvent, record_id: &'a str, failure_reason: Option<&'a str>) -> EventContext<'a> {
    EventContext {
        record_id,
        resource_type: &event.resource_type,
        action: &event.action,
        event_id: &event.id,
        failure_reason,
    }
}

fn log_transition(event: &ProviderEvent, transition: &Transition) {
    let record = &transition.record;
    match transition.kind {
        TransitionKind::Created | TransitionKind::Advanced => tracing::info!(
            event_id = %event.id,
            record_id = %record.id,
            status = %record.status,
            "record updated"
        ),
        TransitionKind::LateRecorded => tracing::info!(
            event_id = %event.id,
            record_id = %record.id,
            status = %record.status,
            action = %event.action,
            "late event recorded without status change"
        ),
        TransitionKind::Duplicate => tracing::debug!(
            event_id = %event.id,
            record_id = %record.id,
            "duplicate event ignored"
        ),
    }
}
