use anyhow::Result;
use payments_relay::domain::event::{parse_body, ProviderEvent};
use payments_relay::domain::signature_request::YousignWebhook;
use payments_relay::error::WebhookError;
use payments_relay::lifecycle::transitions::TransitionKind;
use payments_relay::providers::mock::StaticMetadata;
use payments_relay::repo::{DocumentStore, InMemoryDocumentStore};
use payments_relay::service::frontend_notifier::{
    RecordingNotifier, StatusNotification, StatusNotifier, PAYMENT_UPDATE_PATH, SIGNATURE_UPDATE_PATH,
};
use payments_relay::service::signature_tracker::SignatureTracker;
use payments_relay::service::webhook_receiver::WebhookReceiver;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn receiver(store: Arc<dyn DocumentStore>, notifier: Arc<dyn StatusNotifier>) -> WebhookReceiver {
    WebhookReceiver {
        store,
        notifier,
        metadata: None,
        collection: "payments".to_string(),
        notify_timeout: Duration::from_millis(200),
    }
}

fn event(id: &str, resource_type: &str, action: &str, link: Option<(&str, &str)>) -> ProviderEvent {
    let mut links = Map::new();
    if let Some((key, value)) = link {
        links.insert(key.to_string(), json!(value));
    }
    ProviderEvent {
        id: id.to_string(),
        resource_type: resource_type.to_string(),
        action: action.to_string(),
        links,
        details: None,
        created_at: Some("2024-05-01T10:00:00.000Z".to_string()),
    }
}

fn payment(id: &str, action: &str) -> ProviderEvent {
    event(id, "payments", action, Some(("payment", "p1")))
}

struct FailingStore;

#[async_trait::async_trait]
impl DocumentStore for FailingStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn set(&self, _collection: &str, _id: &str, _doc: Value) -> Result<()> {
        anyhow::bail!("disk full")
    }

    async fn create(&self, _collection: &str, _id: &str, _doc: Value) -> Result<bool> {
        anyhow::bail!("disk full")
    }

    async fn update(&self, _collection: &str, _id: &str, _patch: Map<String, Value>) -> Result<()> {
        anyhow::bail!("disk full")
    }

    async fn ping(&self) -> Result<()> {
        anyhow::bail!("disk full")
    }
}

/// Misses the first read, as a concurrent first delivery would see it.
struct StaleFirstRead {
    inner: InMemoryDocumentStore,
    missed: AtomicBool,
}

#[async_trait::async_trait]
impl DocumentStore for StaleFirstRead {
    fn backend(&self) -> &'static str {
        "stale"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        if !self.missed.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        self.inner.set(collection, id, doc).await
    }

    async fn create(&self, collection: &str, id: &str, doc: Value) -> Result<bool> {
        self.inner.create(collection, id, doc).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> Result<()> {
        self.inner.update(collection, id, patch).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

struct FailingNotifier;

#[async_trait::async_trait]
impl StatusNotifier for FailingNotifier {
    async fn notify(&self, _path: &str, _notification: &StatusNotification) -> Result<()> {
        anyhow::bail!("connection refused")
    }
}

struct StalledNotifier;

#[async_trait::async_trait]
impl StatusNotifier for StalledNotifier {
    async fn notify(&self, _path: &str, _notification: &StatusNotification) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

#[tokio::test]
async fn created_then_confirmed_updates_the_same_record() {
    let store = InMemoryDocumentStore::new();
    let notifier = RecordingNotifier::default();
    let svc = receiver(Arc::new(store.clone()), Arc::new(notifier.clone()));

    svc.process_batch(&[payment("EV1", "created")]).await.unwrap();
    let first = store.get("payments", "p1").await.unwrap().unwrap();
    assert_eq!(first["status"], "pending");
    assert!(first["receivedAt"].is_string());

    svc.process_batch(&[payment("EV2", "confirmed")]).await.unwrap();
    let doc = store.get("payments", "p1").await.unwrap().unwrap();
    assert_eq!(doc["status"], "confirmed");
    assert!(doc["confirmedAt"].is_string());
    assert_eq!(doc["receivedAt"], first["receivedAt"]);
    assert_eq!(doc["lastEventId"], "EV2");

    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].0, PAYMENT_UPDATE_PATH);
    assert_eq!(sent[1].1.resource_id, "p1");
    assert_eq!(sent[1].1.status, "confirmed");
    assert_eq!(sent[1].1.payload["links"]["payment"], "p1");
}

#[tokio::test]
async fn redelivery_is_idempotent() {
    let store = InMemoryDocumentStore::new();
    let notifier = RecordingNotifier::default();
    let svc = receiver(Arc::new(store.clone()), Arc::new(notifier.clone()));
    let batch = [payment("EV1", "created"), payment("EV2", "submitted")];

    svc.process_batch(&batch).await.unwrap();
    let once = store.get("payments", "p1").await.unwrap().unwrap();
    let writes = store.write_count();

    let ack = svc.process_batch(&batch).await.unwrap();
    let twice = store.get("payments", "p1").await.unwrap().unwrap();

    assert_eq!(once, twice);
    assert_eq!(store.write_count(), writes);
    assert!(ack.results.iter().all(|r| r.outcome == TransitionKind::Duplicate));
    assert_eq!(notifier.sent().await.len(), 2);
}

#[tokio::test]
async fn mixed_batch_stores_recognized_and_unknown_records() {
    let store = InMemoryDocumentStore::new();
    let svc = receiver(Arc::new(store.clone()), Arc::new(RecordingNotifier::default()));
    let batch = [
        payment("EV1", "confirmed"),
        event("EV2", "creditors", "updated", Some(("creditor", "CR1"))),
    ];

    let ack = svc.process_batch(&batch).await.unwrap();
    assert!(ack.received);
    assert_eq!(ack.processed, 2);

    assert_eq!(store.get("payments", "p1").await.unwrap().unwrap()["status"], "confirmed");
    let unknown = store.get("payments", "EV2").await.unwrap().unwrap();
    assert_eq!(unknown["status"], "unknown");
    assert_eq!(unknown["resourceType"], "creditors");
}

#[tokio::test]
async fn failure_cause_is_recorded() {
    let store = InMemoryDocumentStore::new();
    let svc = receiver(Arc::new(store.clone()), Arc::new(RecordingNotifier::default()));
    let mut failed = payment("EV3", "failed");
    failed.details = Some(json!({"cause": "insufficient_funds", "origin": "bank"}));

    svc.process_batch(&[failed]).await.unwrap();
    let doc = store.get("payments", "p1").await.unwrap().unwrap();
    assert_eq!(doc["status"], "failed");
    assert_eq!(doc["failureReason"], "insufficient_funds");
    assert!(doc["failedAt"].is_string());
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_write() {
    let store = InMemoryDocumentStore::new();
    let svc = receiver(Arc::new(store.clone()), Arc::new(FailingNotifier));

    let ack = svc.process_batch(&[payment("EV1", "confirmed")]).await.unwrap();
    assert_eq!(ack.results[0].status, "confirmed");
    assert_eq!(store.get("payments", "p1").await.unwrap().unwrap()["status"], "confirmed");
}

#[tokio::test]
async fn stalled_notifier_is_cut_off_by_timeout() {
    let store = InMemoryDocumentStore::new();
    let mut svc = receiver(Arc::new(store.clone()), Arc::new(StalledNotifier));
    svc.notify_timeout = Duration::from_millis(50);

    let started = std::time::Instant::now();
    svc.process_batch(&[payment("EV1", "confirmed")]).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(store.get("payments", "p1").await.unwrap().unwrap()["status"], "confirmed");
}

#[tokio::test]
async fn persistence_failure_aborts_the_batch() {
    let svc = receiver(Arc::new(FailingStore), Arc::new(RecordingNotifier::default()));
    let err = svc.process_batch(&[payment("EV1", "created")]).await.unwrap_err();
    assert!(matches!(err, WebhookError::Persistence(ref msg) if msg.contains("disk full")));
}

#[tokio::test]
async fn paid_out_is_stored_but_not_notified() {
    let store = InMemoryDocumentStore::new();
    let notifier = RecordingNotifier::default();
    let svc = receiver(Arc::new(store.clone()), Arc::new(notifier.clone()));

    svc.process_batch(&[payment("EV1", "confirmed"), payment("EV2", "paid_out")])
        .await
        .unwrap();
    assert_eq!(store.get("payments", "p1").await.unwrap().unwrap()["status"], "paid_out");
    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.status, "confirmed");
}

#[tokio::test]
async fn mandate_notifications_carry_metadata() {
    let store = InMemoryDocumentStore::new();
    let notifier = RecordingNotifier::default();
    let mut svc = receiver(Arc::new(store.clone()), Arc::new(notifier.clone()));
    svc.metadata = Some(Arc::new(
        StaticMetadata::default().with("MD1", json!({"maintenanceId": "m-42"})),
    ));

    let batch = parse_body(
        br#"{"events":[
            {"id":"EV1","resource_type":"mandates","action":"created","links":{"mandate":"MD1"}},
            {"id":"EV2","resource_type":"mandates","action":"active","links":{"mandate":"MD1"}}
        ]}"#,
    )
    .unwrap();
    svc.process_batch(&batch).await.unwrap();

    let sent = notifier.sent().await;
    // mandate creation is stored silently
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "/api/gocardless/mandate-update");
    assert_eq!(sent[0].1.status, "active");
    assert_eq!(sent[0].1.payload["maintenanceId"], "m-42");
    assert_eq!(sent[0].1.payload["metadata"]["maintenanceId"], "m-42");
}

#[tokio::test]
async fn metadata_lookup_failure_still_notifies() {
    let notifier = RecordingNotifier::default();
    let mut svc = receiver(Arc::new(InMemoryDocumentStore::new()), Arc::new(notifier.clone()));
    svc.metadata = Some(Arc::new(StaticMetadata {
        fail: true,
        ..Default::default()
    }));

    svc.process_batch(&[payment("EV1", "submitted")]).await.unwrap();
    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.payload.get("maintenanceId").is_none());
}

#[tokio::test]
async fn yousign_completion_marks_request_signed() {
    let store = InMemoryDocumentStore::new();
    let notifier = RecordingNotifier::default();
    let tracker = SignatureTracker {
        store: Arc::new(store.clone()),
        notifier: Arc::new(notifier.clone()),
        notify_timeout: Duration::from_millis(200),
    };

    let activated = YousignWebhook::parse(
        br#"{"event":"signature_request.activated","signature_request":{"id":"sr-1","status":"ongoing"}}"#,
    )
    .unwrap();
    tracker.apply(&activated).await.unwrap();

    let done = YousignWebhook::parse(
        br#"{"event_id":"e-2","event_name":"signature_request.completed","data":{"signature_request":{"id":"sr-1"}}}"#,
    )
    .unwrap();
    let result = tracker.apply(&done).await.unwrap();
    assert_eq!(result.status, "signed");

    let doc = store.get("signature_requests", "sr-1").await.unwrap().unwrap();
    assert_eq!(doc["status"], "signed");
    assert!(doc["signedAt"].is_string());

    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, SIGNATURE_UPDATE_PATH);
    assert_eq!(sent[0].1.resource_id, "sr-1");
}

#[tokio::test]
async fn unrecognized_action_on_known_payment_is_kept_under_event_id() {
    let store = InMemoryDocumentStore::new();
    let notifier = RecordingNotifier::default();
    let svc = receiver(Arc::new(store.clone()), Arc::new(notifier.clone()));

    svc.process_batch(&[payment("EV1", "created")]).await.unwrap();
    let ack = svc.process_batch(&[payment("EV2", "charged_back")]).await.unwrap();
    assert_eq!(ack.results[0].outcome, TransitionKind::Created);
    assert_eq!(ack.results[0].record_id, "EV2");

    let resource = store.get("payments", "p1").await.unwrap().unwrap();
    assert_eq!(resource["status"], "pending");
    assert_eq!(resource["lastEventId"], "EV1");

    let kept = store.get("payments", "EV2").await.unwrap().unwrap();
    assert_eq!(kept["status"], "unknown");
    assert_eq!(kept["action"], "charged_back");
    assert_eq!(kept["lastEventId"], "EV2");

    let writes = store.write_count();
    let again = svc.process_batch(&[payment("EV2", "charged_back")]).await.unwrap();
    assert_eq!(again.results[0].outcome, TransitionKind::Duplicate);
    assert_eq!(store.write_count(), writes);
    assert_eq!(notifier.sent().await.len(), 1);
}

#[tokio::test]
async fn notification_carries_action_and_local_status() {
    let notifier = RecordingNotifier::default();
    let svc = receiver(Arc::new(InMemoryDocumentStore::new()), Arc::new(notifier.clone()));

    svc.process_batch(&[payment("EV1", "created")]).await.unwrap();
    let sent = notifier.sent().await;
    assert_eq!(sent[0].1.status, "created");
    assert_eq!(sent[0].1.payload["recordStatus"], "pending");
}

#[tokio::test]
async fn lost_creation_race_reapplies_against_stored_record() {
    let inner = InMemoryDocumentStore::new();
    receiver(Arc::new(inner.clone()), Arc::new(RecordingNotifier::default()))
        .process_batch(&[payment("EV1", "confirmed")])
        .await
        .unwrap();

    let notifier = RecordingNotifier::default();
    let stale = StaleFirstRead {
        inner: inner.clone(),
        missed: AtomicBool::new(false),
    };
    let svc = receiver(Arc::new(stale), Arc::new(notifier.clone()));
    let ack = svc.process_batch(&[payment("EV0", "created")]).await.unwrap();

    assert_eq!(ack.results[0].outcome, TransitionKind::Duplicate);
    let doc = inner.get("payments", "p1").await.unwrap().unwrap();
    assert_eq!(doc["status"], "confirmed");
    assert_eq!(doc["lastEventId"], "EV1");
    assert!(notifier.sent().await.is_empty());
}
