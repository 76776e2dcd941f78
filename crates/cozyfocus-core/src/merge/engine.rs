use std::collections::BTreeMap;

use serde_json::Value;

use super::decide::{
    decide_doc, decide_note, decide_session, decide_setting, decide_stats, decide_tag,
    decide_task, Decision, KnownTags,
};
use super::normalize::{
    normalize_doc, normalize_note, normalize_session, normalize_stats, normalize_tag,
    normalize_task,
};
use super::plan::{EntityCounts, MergePlan};
use super::settings::SettingKeyResolver;
use crate::bundle::{parse_bundle, IncomingBundle};
use crate::error::Result;
use crate::model::{DayStats, Doc, Note, Session, SettingEnvelope, Tag, Task};
use crate::storage::{Database, Record, Repo};

/// Final state of every record the import will write, keyed like the store.
#[derive(Debug, Default)]
struct PendingWrites {
    tasks: BTreeMap<String, Task>,
    notes: BTreeMap<String, Note>,
    sessions: BTreeMap<String, Session>,
    stats: BTreeMap<String, DayStats>,
    docs: BTreeMap<String, Doc>,
    settings: BTreeMap<String, SettingEnvelope>,
    tags: BTreeMap<String, Tag>,
}

/// A computed import: the preview plan plus the writes that realize it.
#[derive(Debug)]
pub struct PreparedImport {
    plan: MergePlan,
    writes: PendingWrites,
}

/// Decide every record of one collection.
///
/// A key seen earlier in the same bundle is compared against its pending
/// result rather than the store.
fn merge_collection<T, N>(
    repo: &Repo<'_, T>,
    pending: &mut BTreeMap<String, T>,
    counts: &mut EntityCounts,
    raw: &[Value],
    normalize: impl Fn(&Value) -> Option<N>,
    key_of: impl Fn(&N) -> &str,
    decide: impl Fn(Option<&T>, &N) -> Decision<T>,
) -> Result<()>
where
    T: Record,
{
    for value in raw {
        let Some(incoming) = normalize(value) else {
            counts.skip += 1;
            tracing::debug!(
                collection = T::COLLECTION.table(),
                "skipping record that could not be normalized"
            );
            continue;
        };

        let key = key_of(&incoming);
        let local = match pending.get(key) {
            Some(record) => Some(record.clone()),
            None => repo.get(key)?,
        };
        let decision = decide(local.as_ref(), &incoming);
        counts.count(&decision);
        if let Some(record) = decision.into_record() {
            pending.insert(record.key().to_string(), record);
        }
    }
    Ok(())
}

/// Compute the merge plan for a bundle without writing anything.
///
/// # Errors
/// Returns an error if reading the local store fails.
pub fn prepare_import(db: &Database, bundle: &IncomingBundle) -> Result<PreparedImport> {
    prepare_import_with(db, bundle, &SettingKeyResolver::default())
}

/// [`prepare_import`] with a caller-supplied setting key resolver.
pub fn prepare_import_with(
    db: &Database,
    bundle: &IncomingBundle,
    resolver: &SettingKeyResolver,
) -> Result<PreparedImport> {
    let data = &bundle.data;
    let mut plan = MergePlan::default();
    let mut writes = PendingWrites::default();

    merge_collection(
        &db.tasks(),
        &mut writes.tasks,
        &mut plan.tasks,
        &data.tasks,
        normalize_task,
        |t| t.record.id.as_str(),
        decide_task,
    )?;
    merge_collection(
        &db.notes(),
        &mut writes.notes,
        &mut plan.notes,
        &data.notes,
        normalize_note,
        |n| n.id.as_str(),
        decide_note,
    )?;
    merge_collection(
        &db.sessions(),
        &mut writes.sessions,
        &mut plan.sessions,
        &data.sessions,
        normalize_session,
        |s| s.id.as_str(),
        decide_session,
    )?;
    merge_collection(
        &db.stats(),
        &mut writes.stats,
        &mut plan.stats,
        &data.stats,
        normalize_stats,
        |s| s.day_key.as_str(),
        decide_stats,
    )?;
    merge_collection(
        &db.docs(),
        &mut writes.docs,
        &mut plan.docs,
        &data.docs,
        normalize_doc,
        |d| d.record.id.as_str(),
        decide_doc,
    )?;
    merge_collection(
        &db.settings(),
        &mut writes.settings,
        &mut plan.settings,
        &data.settings,
        |raw| resolver.normalize(raw),
        |s| s.key.as_str(),
        decide_setting,
    )?;

    let local_tags = db.tags().get_all(None)?;
    let mut known = KnownTags::new(local_tags.iter().map(|t| t.name.as_str()));
    let mut tag_counts = data.tags.as_ref().map(|_| EntityCounts::default());
    for value in data.tags.iter().flatten() {
        let decision = match normalize_tag(value) {
            Some(tag) => decide_tag(&mut known, &tag),
            None => Decision::Skip,
        };
        if let Some(counts) = tag_counts.as_mut() {
            counts.count(&decision);
        }
        if let Some(tag) = decision.into_record() {
            writes.tags.insert(tag.name.clone(), tag);
        }
    }

    // Tags carried by imported docs join the registry like local doc edits do.
    for doc in writes.docs.values() {
        for name in &doc.tags {
            let tag = Tag {
                name: name.clone(),
                created_at: doc.updated_at,
            };
            let decision = decide_tag(&mut known, &tag);
            if decision.is_skip() {
                continue;
            }
            tag_counts.get_or_insert_with(EntityCounts::default).count(&decision);
            if let Some(tag) = decision.into_record() {
                writes.tags.insert(tag.name.clone(), tag);
            }
        }
    }
    plan.tags = tag_counts;

    let total = plan.total();
    tracing::debug!(
        add = total.add,
        update = total.update,
        skip = total.skip,
        "import plan computed"
    );
    Ok(PreparedImport { plan, writes })
}

fn put_all<T: Record>(repo: Repo<'_, T>, pending: &BTreeMap<String, T>) -> Result<usize> {
    let records: Vec<T> = pending.values().cloned().collect();
    Ok(repo.bulk_put(&records)?)
}

impl PreparedImport {
    pub fn plan(&self) -> &MergePlan {
        &self.plan
    }

    /// Number of records `apply` will write.
    pub fn pending_writes(&self) -> usize {
        let w = &self.writes;
        w.tasks.len()
            + w.notes.len()
            + w.sessions.len()
            + w.stats.len()
            + w.docs.len()
            + w.settings.len()
            + w.tags.len()
    }

    /// Write the planned changes, one bulk upsert per collection.
    ///
    /// Tags go last so they land after the docs that reference them.
    ///
    /// # Errors
    /// Returns an error if a collection write fails. Collections written
    /// before the failure stay written.
    pub fn apply(self, db: &Database) -> Result<MergePlan> {
        let w = &self.writes;
        let tasks = put_all(db.tasks(), &w.tasks)?;
        let notes = put_all(db.notes(), &w.notes)?;
        let sessions = put_all(db.sessions(), &w.sessions)?;
        let stats = put_all(db.stats(), &w.stats)?;
        let docs = put_all(db.docs(), &w.docs)?;
        let settings = put_all(db.settings(), &w.settings)?;
        let tags = put_all(db.tags(), &w.tags)?;

        tracing::info!(
            tasks,
            notes,
            sessions,
            stats,
            docs,
            settings,
            tags,
            "import applied"
        );
        Ok(self.plan)
    }
}

/// Plan and apply a parsed bundle.
pub fn import_bundle(db: &Database, bundle: &IncomingBundle) -> Result<MergePlan> {
    prepare_import(db, bundle)?.apply(db)
}

/// Parse, plan and (unless `dry_run`) apply an exported JSON document.
///
/// # Errors
/// Fails before touching the store if the text is not a CozyFocus bundle.
pub fn import_json(db: &Database, text: &str, dry_run: bool) -> Result<MergePlan> {
    let bundle = parse_bundle(text)?;
    let prepared = prepare_import(db, &bundle)?;
    if dry_run {
        return Ok(prepared.plan);
    }
    prepared.apply(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(data: Value) -> IncomingBundle {
        parse_bundle(&json!({"app": "CozyFocus", "schemaVersion": 2, "data": data}).to_string())
            .unwrap()
    }

    #[test]
    fn prepare_writes_nothing() {
        let db = Database::open_memory().unwrap();
        let incoming = bundle(json!({
            "tasks": [{"id": "t1", "dayKey": "2026-03-10", "title": "a", "createdAt": 1, "updatedAt": 1}],
            "tags": [{"name": "work", "createdAt": 1}]
        }));
        let prepared = prepare_import(&db, &incoming).unwrap();
        assert_eq!(prepared.plan().tasks.add, 1);
        assert_eq!(prepared.plan().tags.unwrap().add, 1);
        assert_eq!(prepared.pending_writes(), 2);
        assert_eq!(db.tasks().count().unwrap(), 0);
        assert_eq!(db.tags().count().unwrap(), 0);

        prepared.apply(&db).unwrap();
        assert_eq!(db.tasks().count().unwrap(), 1);
        assert_eq!(db.tags().count().unwrap(), 1);
    }

    #[test]
    fn duplicates_within_bundle_resolve_against_pending() {
        let db = Database::open_memory().unwrap();
        let incoming = bundle(json!({
            "notes": [
                {"id": "n1", "dayKey": "2026-03-10", "content": "first", "updatedAt": 1},
                {"id": "n1", "dayKey": "2026-03-10", "content": "second", "updatedAt": 2},
                {"id": "n1", "dayKey": "2026-03-10", "content": "stale", "updatedAt": 1}
            ]
        }));
        let plan = import_bundle(&db, &incoming).unwrap();
        assert_eq!(plan.notes, EntityCounts { add: 1, update: 1, skip: 1 });
        assert_eq!(db.notes().get("n1").unwrap().unwrap().content, "second");
    }

    #[test]
    fn bad_records_are_skipped_not_fatal() {
        let db = Database::open_memory().unwrap();
        let incoming = bundle(json!({
            "tasks": [42, {"title": "no day"}],
            "settings": [{"theme": "dark"}, {"key": "ui.timeFormat", "value": "12h", "updatedAt": 1}]
        }));
        let plan = import_bundle(&db, &incoming).unwrap();
        assert_eq!(plan.tasks.skip, 2);
        assert_eq!(plan.settings, EntityCounts { add: 1, update: 0, skip: 1 });
        assert!(plan.tags.is_none());
    }

    #[test]
    fn dry_run_leaves_store_untouched() {
        let db = Database::open_memory().unwrap();
        let text = json!({
            "app": "CozyFocus",
            "data": {"stats": [{"dayKey": "2026-03-10", "focusCompletedCount": 4}]}
        })
        .to_string();
        let plan = import_json(&db, &text, true).unwrap();
        assert_eq!(plan.stats.add, 1);
        assert_eq!(db.stats().count().unwrap(), 0);

        import_json(&db, &text, false).unwrap();
        assert_eq!(db.stats().count().unwrap(), 1);
        assert!(import_json(&db, &text, false).unwrap().is_noop());
    }

    #[test]
    fn foreign_bundle_fails_before_writing() {
        let db = Database::open_memory().unwrap();
        let err = import_json(&db, r#"{"app":"Elsewhere","data":{}}"#, false).unwrap_err();
        assert!(err.to_string().contains("not a recognized CozyFocus export"));
    }
}
