//! Persistence collaborator for serialized records.
//!
//! Records are kept as JSON rows, one table per record kind. [`MemoryStore`]
//! keeps the tables in process; [`JsonFileStore`] keeps each table in
//! `<dir>/<kind>.json` and rewrites the file atomically on every change.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::config::get_data_dir;
use crate::error::StoreError;
use crate::models::Record;

/// Create / read / update / delete per record kind.
pub trait RecordStore {
    /// Insert a new record. Auto-key kinds get their key assigned here; the
    /// stored record is returned.
    fn insert<R: Record>(&self, record: R) -> Result<R, StoreError>;

    fn get<R: Record>(&self, key: &str) -> Result<Option<R>, StoreError>;

    /// All records of a kind, in insertion order.
    fn list<R: Record>(&self) -> Result<Vec<R>, StoreError>;

    /// Overwrite an existing record with the same key.
    fn replace<R: Record>(&self, record: &R) -> Result<(), StoreError>;

    /// Returns false if no record had that key.
    fn remove<R: Record>(&self, key: &str) -> Result<bool, StoreError>;
}

type Table = Vec<Value>;

fn row_key(row: &Value, key_field: &str) -> Option<String> {
    match row.get(key_field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn position<R: Record>(rows: &Table, key: &str) -> Option<usize> {
    rows.iter()
        .position(|row| row_key(row, R::KEY_FIELD).as_deref() == Some(key))
}

fn next_key<R: Record>(rows: &Table) -> Result<u64, StoreError> {
    rows.iter()
        .filter_map(|row| row.get(R::KEY_FIELD).and_then(Value::as_u64))
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or(StoreError::KeysExhausted { kind: R::KIND })
}

fn insert_row<R: Record>(rows: &mut Table, mut record: R) -> Result<R, StoreError> {
    if R::AUTO_KEY {
        record.assign_key(next_key::<R>(rows)?);
    }
    let key = record.key().ok_or(StoreError::MissingKey { kind: R::KIND })?;
    if position::<R>(rows, &key).is_some() {
        return Err(StoreError::Conflict { kind: R::KIND, key });
    }
    rows.push(serde_json::to_value(&record)?);
    Ok(record)
}

fn get_row<R: Record>(rows: &Table, key: &str) -> Result<Option<R>, StoreError> {
    match position::<R>(rows, key) {
        Some(idx) => Ok(Some(serde_json::from_value(rows[idx].clone())?)),
        None => Ok(None),
    }
}

fn list_rows<R: Record>(rows: &Table) -> Result<Vec<R>, StoreError> {
    rows.iter()
        .map(|row| serde_json::from_value(row.clone()).map_err(StoreError::from))
        .collect()
}

fn replace_row<R: Record>(rows: &mut Table, record: &R) -> Result<(), StoreError> {
    let key = record.key().ok_or(StoreError::MissingKey { kind: R::KIND })?;
    let idx = position::<R>(rows, &key).ok_or(StoreError::NotFound { kind: R::KIND, key })?;
    rows[idx] = serde_json::to_value(record)?;
    Ok(())
}

fn remove_row<R: Record>(rows: &mut Table, key: &str) -> bool {
    match position::<R>(rows, key) {
        Some(idx) => {
            rows.remove(idx);
            true
        }
        None => false,
    }
}

/// In-process tables, lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<&'static str, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_table<T>(&self, kind: &'static str, f: impl FnOnce(&mut Table) -> T) -> T {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        f(tables.entry(kind).or_default())
    }
}

impl RecordStore for MemoryStore {
    fn insert<R: Record>(&self, record: R) -> Result<R, StoreError> {
        self.with_table(R::KIND, |rows| insert_row(rows, record))
    }

    fn get<R: Record>(&self, key: &str) -> Result<Option<R>, StoreError> {
        self.with_table(R::KIND, |rows| get_row(rows, key))
    }

    fn list<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        self.with_table(R::KIND, |rows| list_rows(rows))
    }

    fn replace<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        self.with_table(R::KIND, |rows| replace_row(rows, record))
    }

    fn remove<R: Record>(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.with_table(R::KIND, |rows| remove_row::<R>(rows, key)))
    }
}

/// One pretty-printed JSON array file per record kind.
pub struct JsonFileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store rooted at `DOROSEE_DATA_DIR`.
    pub fn from_env() -> Self {
        Self::new(get_data_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, kind: &str) -> PathBuf {
        self.dir.join(format!("{}.json", kind))
    }

    fn load(&self, kind: &str) -> Result<Table, StoreError> {
        let path = self.table_path(kind);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn persist(&self, kind: &str, rows: &Table) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(rows)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.table_path(kind))
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Load, apply `f`, and write back only if `f` succeeded and changed rows.
    fn modify<T>(
        &self,
        kind: &'static str,
        f: impl FnOnce(&mut Table) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut rows = self.load(kind)?;
        let (out, changed) = f(&mut rows)?;
        if changed {
            if let Err(e) = self.persist(kind, &rows) {
                tracing::error!(%e, kind, "Failed to persist table");
                return Err(e);
            }
        }
        Ok(out)
    }

    fn read<T>(
        &self,
        kind: &'static str,
        f: impl FnOnce(&Table) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let rows = self.load(kind)?;
        f(&rows)
    }
}

impl RecordStore for JsonFileStore {
    fn insert<R: Record>(&self, record: R) -> Result<R, StoreError> {
        self.modify(R::KIND, |rows| insert_row(rows, record).map(|r| (r, true)))
    }

    fn get<R: Record>(&self, key: &str) -> Result<Option<R>, StoreError> {
        self.read(R::KIND, |rows| get_row(rows, key))
    }

    fn list<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        self.read(R::KIND, |rows| list_rows(rows))
    }

    fn replace<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        self.modify(R::KIND, |rows| replace_row(rows, record).map(|_| ((), true)))
    }

    fn remove<R: Record>(&self, key: &str) -> Result<bool, StoreError> {
        self.modify(R::KIND, |rows| {
            let removed = remove_row::<R>(rows, key);
            Ok((removed, removed))
        })
    }
}
