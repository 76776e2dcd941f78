use super::types::{BundleData, ExportBundle, APP_ID};
use crate::clock::Clock;
use crate::error::Result;
use crate::storage::{Database, Record, CURRENT_SCHEMA_VERSION};

/// Every record of a collection, or nothing if its table does not exist yet.
fn read_all<T: Record>(db: &Database) -> Result<Vec<T>> {
    if !db.has_collection(T::COLLECTION)? {
        tracing::debug!(collection = T::COLLECTION.table(), "collection missing; exporting as empty");
        return Ok(Vec::new());
    }
    Ok(db.repo::<T>().get_all(None)?)
}

/// Snapshot the whole store.
///
/// `exported_at` overrides the clock so tests can produce byte-stable
/// output. Tags are only included when the store has a tag registry.
///
/// # Errors
/// Returns an error if an existing collection cannot be read.
pub fn export_bundle(db: &Database, exported_at: Option<i64>, clock: &dyn Clock) -> Result<ExportBundle> {
    let tags = if db.has_collection(crate::storage::Collection::Tags)? {
        Some(db.tags().get_all(None)?)
    } else {
        None
    };

    let bundle = ExportBundle {
        schema_version: CURRENT_SCHEMA_VERSION,
        exported_at: exported_at.unwrap_or_else(|| clock.now_ms()),
        app: APP_ID.to_string(),
        data: BundleData {
            tasks: read_all(db)?,
            notes: read_all(db)?,
            sessions: read_all(db)?,
            stats: read_all(db)?,
            docs: read_all(db)?,
            settings: read_all(db)?,
            tags,
        },
    };

    tracing::info!(
        records = bundle.record_count(),
        exported_at = bundle.exported_at,
        "export bundle built"
    );
    Ok(bundle)
}
