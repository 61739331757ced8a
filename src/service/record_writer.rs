use crate::domain::record::{changed_fields, EventRecord};
use crate::lifecycle::transitions::Transition;
use crate::repo::DocumentStore;
use anyhow::{Context, Result};

pub async fn load_record(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<EventRecord>> {
    let doc = store
        .get(collection, id)
        .await
        .with_context(|| format!("reading {collection}/{id}"))?;
    doc.map(EventRecord::from_document)
        .transpose()
        .with_context(|| format!("decoding {collection}/{id}"))
}

/// Writes a transition: `create` on first observation, a partial `update`
/// with only the changed fields afterwards, nothing for duplicates.
///
/// Returns `false` when another writer created the record first; the caller
/// reloads and reapplies.
pub async fn persist(store: &dyn DocumentStore, collection: &str, transition: &Transition) -> Result<bool> {
    if !transition.kind.writes() {
        return Ok(true);
    }

    let record = &transition.record;
    match &transition.previous {
        None => store
            .create(collection, &record.id, record.to_document()?)
            .await
            .with_context(|| format!("creating {collection}/{}", record.id)),
        Some(previous) => {
            let patch = changed_fields(previous, record)?;
            if !patch.is_empty() {
                store
                    .update(collection, &record.id, patch)
                    .await
                    .with_context(|| format!("updating {collection}/{}", record.id))?;
            }
            Ok(true)
        }
    }
}
