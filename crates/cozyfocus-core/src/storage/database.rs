//! SQLite-backed document store.
//!
//! Each entity collection is a table of JSON documents keyed by id (or name,
//! or day key) with a secondary index on the calendar day. [`Repo`] gives a
//! typed view over one collection:
//! - `get_all` / `get_range` scan by day index
//! - `get` / `put` / `delete` by key
//! - `bulk_put` upserts many records in a single transaction

use std::marker::PhantomData;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::clock::MonotonicStamp;
use crate::error::{CoreError, DatabaseError};
use crate::model::{DayStats, Doc, Note, Session, SettingEnvelope, Tag, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Tasks,
    Notes,
    Docs,
    Tags,
    Sessions,
    Stats,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Tasks,
        Collection::Notes,
        Collection::Docs,
        Collection::Tags,
        Collection::Sessions,
        Collection::Stats,
        Collection::Settings,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Notes => "notes",
            Collection::Docs => "docs",
            Collection::Tags => "tags",
            Collection::Sessions => "sessions",
            Collection::Stats => "stats",
            Collection::Settings => "settings",
        }
    }
}

/// A document that lives in exactly one collection.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    /// Primary key within the collection.
    fn key(&self) -> &str;

    /// Calendar day used by the secondary index, if the record is day-scoped.
    fn day_key(&self) -> Option<&str> {
        None
    }
}

impl Record for Task {
    const COLLECTION: Collection = Collection::Tasks;
    fn key(&self) -> &str {
        &self.id
    }
    fn day_key(&self) -> Option<&str> {
        Some(&self.day_key)
    }
}

impl Record for Note {
    const COLLECTION: Collection = Collection::Notes;
    fn key(&self) -> &str {
        &self.id
    }
    fn day_key(&self) -> Option<&str> {
        Some(&self.day_key)
    }
}

impl Record for Doc {
    const COLLECTION: Collection = Collection::Docs;
    fn key(&self) -> &str {
        &self.id
    }
    fn day_key(&self) -> Option<&str> {
        Some(&self.day_key)
    }
}

impl Record for Tag {
    const COLLECTION: Collection = Collection::Tags;
    fn key(&self) -> &str {
        &self.name
    }
}

impl Record for Session {
    const COLLECTION: Collection = Collection::Sessions;
    fn key(&self) -> &str {
        &self.id
    }
    fn day_key(&self) -> Option<&str> {
        Some(&self.day_key)
    }
}

impl Record for DayStats {
    const COLLECTION: Collection = Collection::Stats;
    fn key(&self) -> &str {
        &self.day_key
    }
    fn day_key(&self) -> Option<&str> {
        Some(&self.day_key)
    }
}

impl Record for SettingEnvelope {
    const COLLECTION: Collection = Collection::Settings;
    fn key(&self) -> &str {
        &self.key
    }
}

/// Typed accessor over one collection.
pub struct Repo<'a, T> {
    conn: &'a Connection,
    _marker: PhantomData<T>,
}

impl<'a, T: Record> Repo<'a, T> {
    /// Works over a plain connection or an open transaction.
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            _marker: PhantomData,
        }
    }

    fn table() -> &'static str {
        T::COLLECTION.table()
    }

    fn decode(key: &str, body: &str) -> Result<T, DatabaseError> {
        serde_json::from_str(body).map_err(|e| DatabaseError::CorruptRecord {
            collection: Self::table(),
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    fn encode(record: &T) -> Result<String, DatabaseError> {
        serde_json::to_string(record).map_err(|e| DatabaseError::CorruptRecord {
            collection: Self::table(),
            key: record.key().to_string(),
            message: e.to_string(),
        })
    }

    fn collect_rows(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<T>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (key, body) = row?;
            out.push(Self::decode(&key, &body)?);
        }
        Ok(out)
    }

    pub fn get(&self, key: &str) -> Result<Option<T>, DatabaseError> {
        let body: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT body FROM {} WHERE key = ?1", Self::table()),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| Self::decode(key, &b)).transpose()
    }

    /// All records, or only those of one day.
    pub fn get_all(&self, day_key: Option<&str>) -> Result<Vec<T>, DatabaseError> {
        match day_key {
            Some(day) => self.collect_rows(
                &format!(
                    "SELECT key, body FROM {} WHERE day_key = ?1 ORDER BY key",
                    Self::table()
                ),
                &[&day],
            ),
            None => self.collect_rows(
                &format!("SELECT key, body FROM {} ORDER BY key", Self::table()),
                &[],
            ),
        }
    }

    /// Records whose day falls within `from..=to`.
    pub fn get_range(&self, from: &str, to: &str) -> Result<Vec<T>, DatabaseError> {
        self.collect_rows(
            &format!(
                "SELECT key, body FROM {} WHERE day_key BETWEEN ?1 AND ?2 ORDER BY day_key, key",
                Self::table()
            ),
            &[&from, &to],
        )
    }

    pub fn put(&self, record: &T) -> Result<(), DatabaseError> {
        let body = Self::encode(record)?;
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (key, day_key, body) VALUES (?1, ?2, ?3)",
                Self::table()
            ),
            params![record.key(), record.day_key(), body],
        )?;
        Ok(())
    }

    /// Upsert every record inside one transaction.
    ///
    /// Must not be called while another transaction is open on the same
    /// connection; use [`Repo::put`] inside an outer transaction instead.
    pub fn bulk_put(&self, records: &[T]) -> Result<usize, DatabaseError> {
        if records.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {} (key, day_key, body) VALUES (?1, ?2, ?3)",
                Self::table()
            ))?;
            for record in records {
                let body = Self::encode(record)?;
                stmt.execute(params![record.key(), record.day_key(), body])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let n = self.conn.execute(
            &format!("DELETE FROM {} WHERE key = ?1", Self::table()),
            params![key],
        )?;
        Ok(n > 0)
    }

    pub fn count(&self) -> Result<u64, DatabaseError> {
        let n: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", Self::table()),
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DataResetOptions {
    pub tasks: bool,
    pub notes: bool,
    pub docs: bool,
    pub tags: bool,
    pub sessions: bool,
    pub stats: bool,
    pub settings: bool,
}

impl DataResetOptions {
    pub fn all() -> Self {
        Self {
            tasks: true,
            notes: true,
            docs: true,
            tags: true,
            sessions: true,
            stats: true,
            settings: true,
        }
    }

    fn selected(&self) -> Vec<Collection> {
        let flags = [
            (Collection::Tasks, self.tasks),
            (Collection::Notes, self.notes),
            (Collection::Docs, self.docs),
            (Collection::Tags, self.tags),
            (Collection::Sessions, self.sessions),
            (Collection::Stats, self.stats),
            (Collection::Settings, self.settings),
        ];
        flags
            .into_iter()
            .filter_map(|(c, on)| on.then_some(c))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataResetSummary {
    pub deleted: Vec<(Collection, usize)>,
}

impl DataResetSummary {
    pub fn deleted_from(&self, collection: Collection) -> usize {
        self.deleted
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// The local store: one SQLite connection owning every collection.
pub struct Database {
    conn: Connection,
    pub(crate) note_stamp: MonotonicStamp,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/cozyfocus.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("cozyfocus.db");
        Ok(Self::open_at(path)?)
    }

    /// Open (creating if needed) a database file at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// In-memory database stopped at an older schema version.
    #[cfg(test)]
    pub(crate) fn open_memory_at_version(version: i32) -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        migrations::migrate_to(&conn, version)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            note_stamp: MonotonicStamp::new(),
        })
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            note_stamp: MonotonicStamp::new(),
        })
    }

    pub fn schema_version(&self) -> i32 {
        migrations::get_schema_version(&self.conn)
    }

    /// Whether the collection's table has been created.
    pub fn has_collection(&self, collection: Collection) -> Result<bool, DatabaseError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![collection.table()],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn repo<T: Record>(&self) -> Repo<'_, T> {
        Repo::new(&self.conn)
    }

    pub fn tasks(&self) -> Repo<'_, Task> {
        self.repo()
    }

    pub fn notes(&self) -> Repo<'_, Note> {
        self.repo()
    }

    pub fn docs(&self) -> Repo<'_, Doc> {
        self.repo()
    }

    pub fn tags(&self) -> Repo<'_, Tag> {
        self.repo()
    }

    pub fn sessions(&self) -> Repo<'_, Session> {
        self.repo()
    }

    pub fn stats(&self) -> Repo<'_, DayStats> {
        self.repo()
    }

    pub fn settings(&self) -> Repo<'_, SettingEnvelope> {
        self.repo()
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete selected collections in a single transaction.
    ///
    /// This is the only operation that lowers day stats.
    /// Returns how many rows each selected collection held before deletion.
    pub fn reset_data(&self, options: DataResetOptions) -> Result<DataResetSummary, DatabaseError> {
        let selected = options.selected();
        let tx = self.conn.unchecked_transaction()?;
        let mut summary = DataResetSummary::default();
        for collection in selected {
            let n = tx.execute(&format!("DELETE FROM {}", collection.table()), [])?;
            summary.deleted.push((collection, n));
        }
        tx.commit()?;
        tracing::info!(?summary, "local data reset");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, day: &str) -> Task {
        Task {
            id: id.to_string(),
            day_key: day.to_string(),
            title: format!("task {id}"),
            completed: false,
            created_at: 1,
            updated_at: 1,
            completed_at: None,
        }
    }

    #[test]
    fn put_get_delete() {
        let db = Database::open_memory().unwrap();
        let repo = db.tasks();
        assert!(repo.get("a").unwrap().is_none());

        repo.put(&task("a", "2026-03-10")).unwrap();
        assert_eq!(repo.get("a").unwrap().unwrap().title, "task a");

        assert!(repo.delete("a").unwrap());
        assert!(!repo.delete("a").unwrap());
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn put_replaces_existing_key() {
        let db = Database::open_memory().unwrap();
        let mut t = task("a", "2026-03-10");
        db.tasks().put(&t).unwrap();
        t.title = "renamed".into();
        db.tasks().put(&t).unwrap();
        assert_eq!(db.tasks().count().unwrap(), 1);
        assert_eq!(db.tasks().get("a").unwrap().unwrap().title, "renamed");
    }

    #[test]
    fn day_index_and_range_queries() {
        let db = Database::open_memory().unwrap();
        db.tasks()
            .bulk_put(&[
                task("a", "2026-03-09"),
                task("b", "2026-03-10"),
                task("c", "2026-03-10"),
                task("d", "2026-03-12"),
            ])
            .unwrap();

        let day = db.tasks().get_all(Some("2026-03-10")).unwrap();
        assert_eq!(day.len(), 2);

        let range = db.tasks().get_range("2026-03-10", "2026-03-12").unwrap();
        let ids: Vec<_> = range.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d"]);

        assert_eq!(db.tasks().get_all(None).unwrap().len(), 4);
    }

    #[test]
    fn corrupt_body_is_reported_not_panicked() {
        let db = Database::open_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO tasks (key, day_key, body) VALUES ('x', NULL, 'not json')",
                [],
            )
            .unwrap();
        let err = db.tasks().get("x").unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRecord { collection: "tasks", .. }));
    }

    #[test]
    fn missing_collection_detected() {
        let db = Database::open_memory_at_version(1).unwrap();
        assert!(db.has_collection(Collection::Tasks).unwrap());
        assert!(!db.has_collection(Collection::Tags).unwrap());
        assert!(db.tags().get_all(None).is_err());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn reset_data_clears_only_selected_collections() {
        let db = Database::open_memory().unwrap();
        db.tasks().put(&task("a", "2026-03-10")).unwrap();
        db.stats().put(&DayStats::empty("2026-03-10")).unwrap();

        let summary = db
            .reset_data(DataResetOptions {
                stats: true,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(summary.deleted_from(Collection::Stats), 1);
        assert_eq!(summary.deleted_from(Collection::Tasks), 0);
        assert_eq!(db.tasks().count().unwrap(), 1);
        assert_eq!(db.stats().count().unwrap(), 0);
    }
}
