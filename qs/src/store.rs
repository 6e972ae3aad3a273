//! Core Store implementation

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::record::Record;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    data       TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
);
";

/// SQLite-backed record store
///
/// Every mutating call is a single statement, so each record is written
/// atomically. There are no multi-record transactions.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create a store at the given database path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Store::open: called");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!(%mode, "Store::open: journal mode set");

        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init()?;

        info!(path = %path.display(), "Opened queue store");
        Ok(store)
    }

    /// Open a store that lives only in memory (useful for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        debug!("Store::open_in_memory: called");
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Path of the backing database file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // === Document-level operations ===

    /// Insert a new document, failing if the id is already taken
    pub fn insert_value(&mut self, collection: &str, id: &str, data: &Value, updated_at: i64) -> StoreResult<()> {
        debug!(%collection, %id, "Store::insert_value: called");
        let text = serde_json::to_string(data)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO records (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![collection, id, text, updated_at],
        )?;

        if inserted == 0 {
            debug!(%collection, %id, "Store::insert_value: duplicate id");
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Fetch a document by id
    pub fn get_value(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        debug!(%collection, %id, "Store::get_value: called");
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        match text {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Replace an existing document, failing if it is absent
    pub fn update_value(&mut self, collection: &str, id: &str, data: &Value, updated_at: i64) -> StoreResult<()> {
        debug!(%collection, %id, "Store::update_value: called");
        let text = serde_json::to_string(data)?;
        let changed = self.conn.execute(
            "UPDATE records SET data = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
            params![collection, id, text, updated_at],
        )?;

        if changed == 0 {
            debug!(%collection, %id, "Store::update_value: not found");
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// All documents of a collection, in insertion order
    pub fn list_values(&self, collection: &str) -> StoreResult<Vec<Value>> {
        debug!(%collection, "Store::list_values: called");
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM records WHERE collection = ?1 ORDER BY rowid")?;
        let rows = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|text| serde_json::from_str(text).map_err(StoreError::from))
            .collect()
    }

    /// Delete a document, returning whether it existed
    pub fn delete(&mut self, collection: &str, id: &str) -> StoreResult<bool> {
        debug!(%collection, %id, "Store::delete: called");
        let removed = self.conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(removed > 0)
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Remove every document in a collection, returning how many were removed
    pub fn clear(&mut self, collection: &str) -> StoreResult<usize> {
        debug!(%collection, "Store::clear: called");
        let removed = self
            .conn
            .execute("DELETE FROM records WHERE collection = ?1", params![collection])?;
        info!(%collection, removed, "Cleared collection");
        Ok(removed)
    }

    /// Names of all collections holding at least one document
    pub fn collections(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT collection FROM records ORDER BY collection")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    // === Typed operations ===

    /// Create a new record, returning its id
    pub fn create<R: Record>(&mut self, record: R) -> StoreResult<String> {
        let id = record.id().to_string();
        let data = serde_json::to_value(&record)?;
        self.insert_value(R::collection_name(), &id, &data, record.updated_at())?;
        Ok(id)
    }

    /// Get a record by id
    pub fn get<R: Record>(&self, id: &str) -> StoreResult<Option<R>> {
        match self.get_value(R::collection_name(), id)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Replace an existing record
    pub fn update<R: Record>(&mut self, record: R) -> StoreResult<()> {
        let data = serde_json::to_value(&record)?;
        self.update_value(R::collection_name(), record.id(), &data, record.updated_at())
    }

    /// All records of a type, in insertion order
    pub fn list<R: Record>(&self) -> StoreResult<Vec<R>> {
        self.list_values(R::collection_name())?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }

    /// Delete a record of a type by id
    pub fn delete_record<R: Record>(&mut self, id: &str) -> StoreResult<bool> {
        self.delete(R::collection_name(), id)
    }
}
