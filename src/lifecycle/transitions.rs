use crate::domain::record::{EventRecord, UNKNOWN_STATUS};
use crate::lifecycle::state::{LifecycleAction, LifecycleStatus, Milestone};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct EventContext<'a> {
    pub record_id: &'a str,
    pub resource_type: &'a str,
    pub action: &'a str,
    pub event_id: &'a str,
    pub failure_reason: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Created,
    Advanced,
    LateRecorded,
    Duplicate,
}

impl TransitionKind {
    pub fn writes(self) -> bool {
        matches!(self, Self::Created | Self::Advanced | Self::LateRecorded)
    }

    pub fn changes_status(self) -> bool {
        matches!(self, Self::Created | Self::Advanced)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub previous: Option<EventRecord>,
    pub record: EventRecord,
}

pub fn apply_action<A: LifecycleAction>(
    existing: Option<EventRecord>,
    action: A,
    ctx: &EventContext<'_>,
    now: DateTime<Utc>,
) -> Transition {
    let Some(previous) = existing else {
        let mut record = EventRecord::new(ctx.record_id, ctx.resource_type, now);
        advance(&mut record, action, ctx, now);
        return Transition {
            kind: TransitionKind::Created,
            previous: None,
            record,
        };
    };

    let mut record = previous.clone();
    let kind = match A::Status::parse(&record.status) {
        None => {
            // unknown placeholder adopts the first recognized action
            advance(&mut record, action, ctx, now);
            TransitionKind::Advanced
        }
        Some(current) if current == action.target() => TransitionKind::Duplicate,
        Some(current) if action.allowed_from(current) => {
            advance(&mut record, action, ctx, now);
            TransitionKind::Advanced
        }
        Some(_) => {
            if record_milestone(&mut record, action, ctx, now) {
                TransitionKind::LateRecorded
            } else {
                TransitionKind::Duplicate
            }
        }
    };

    Transition {
        kind,
        previous: Some(previous),
        record,
    }
}

/// Storage key for an unrecognized event. A record already owned by another
/// event is left alone and the event gets a record under its own id.
pub fn unrecognized_key<'a>(existing: Option<&EventRecord>, record_id: &'a str, event_id: &'a str) -> &'a str {
    match existing {
        Some(record) if record.last_event_id != event_id => event_id,
        _ => record_id,
    }
}

/// `existing` is whatever is stored under `ctx.record_id`, which the caller
/// picks with [`unrecognized_key`]. Anything already there is this event.
pub fn apply_unrecognized(
    existing: Option<EventRecord>,
    ctx: &EventContext<'_>,
    now: DateTime<Utc>,
) -> Transition {
    match existing {
        None => {
            let mut record = EventRecord::new(ctx.record_id, ctx.resource_type, now);
            record.status = UNKNOWN_STATUS.to_string();
            record.action = ctx.action.to_string();
            record.last_event_id = ctx.event_id.to_string();
            Transition {
                kind: TransitionKind::Created,
                previous: None,
                record,
            }
        }
        Some(previous) => Transition {
            kind: TransitionKind::Duplicate,
            record: previous.clone(),
            previous: Some(previous),
        },
    }
}

fn advance<A: LifecycleAction>(
    record: &mut EventRecord,
    action: A,
    ctx: &EventContext<'_>,
    now: DateTime<Utc>,
) {
    record.status = action.target().as_str().to_string();
    record.action = action.as_str().to_string();
    record.last_event_id = ctx.event_id.to_string();
    record_milestone(record, action, ctx, now);
}

fn record_milestone<A: LifecycleAction>(
    record: &mut EventRecord,
    action: A,
    ctx: &EventContext<'_>,
    now: DateTime<Utc>,
) -> bool {
    let milestone = action.milestone();
    let stamped = record.stamp(milestone, now);
    if stamped && milestone == Milestone::Failed && record.failure_reason.is_none() {
        record.failure_reason = ctx.failure_reason.map(str::to_string);
    }
    stamped
}
