use crate::lifecycle::state::Milestone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN_STATUS: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub resource_type: String,
    pub action: String,
    pub status: String,
    #[serde(default)]
    pub last_event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_out_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declined_at: Option<DateTime<Utc>>,
    // assigned by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EventRecord {
    pub fn new(id: &str, resource_type: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            resource_type: resource_type.to_string(),
            action: String::new(),
            status: UNKNOWN_STATUS.to_string(),
            last_event_id: String::new(),
            failure_reason: None,
            received_at: Some(now),
            submitted_at: None,
            confirmed_at: None,
            failed_at: None,
            cancelled_at: None,
            paid_out_at: None,
            activated_at: None,
            expired_at: None,
            signed_at: None,
            declined_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn slot(&mut self, milestone: Milestone) -> &mut Option<DateTime<Utc>> {
        match milestone {
            Milestone::Received => &mut self.received_at,
            Milestone::Submitted => &mut self.submitted_at,
            Milestone::Confirmed => &mut self.confirmed_at,
            Milestone::Failed => &mut self.failed_at,
            Milestone::Cancelled => &mut self.cancelled_at,
            Milestone::PaidOut => &mut self.paid_out_at,
            Milestone::Activated => &mut self.activated_at,
            Milestone::Expired => &mut self.expired_at,
            Milestone::Signed => &mut self.signed_at,
            Milestone::Declined => &mut self.declined_at,
        }
    }

    /// Sets the milestone only on its first observation. Returns whether it changed.
    pub fn stamp(&mut self, milestone: Milestone, now: DateTime<Utc>) -> bool {
        let slot = self.slot(milestone);
        if slot.is_some() {
            return false;
        }
        *slot = Some(now);
        true
    }

    pub fn to_document(&self) -> anyhow::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_document(doc: Value) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(doc)?)
    }
}

/// Top-level fields of `current` that differ from `previous`, suitable for a
/// partial merge update.
pub fn changed_fields(previous: &EventRecord, current: &EventRecord) -> anyhow::Result<Map<String, Value>> {
    let before = previous.to_document()?;
    let after = current.to_document()?;

    let mut patch = Map::new();
    if let Value::Object(after) = after {
        for (key, value) in after {
            if before.get(&key) != Some(&value) {
                patch.insert(key, value);
            }
        }
    }
    Ok(patch)
}
