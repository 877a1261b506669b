//! JSON-file table store.
//!
//! The whole database is one JSON object whose top-level keys are table names
//! and whose values are arrays of records. The file is loaded once; every
//! mutation runs under a single async mutex and rewrites the file through a
//! temporary sibling that is renamed into place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::utils::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Tickets,
    Sessions,
    Jobs,
    Applications,
    Settings,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Users,
        Table::Tickets,
        Table::Sessions,
        Table::Jobs,
        Table::Applications,
        Table::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Tickets => "tickets",
            Table::Sessions => "sessions",
            Table::Jobs => "jobs",
            Table::Applications => "applications",
            Table::Settings => "app_settings",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type Tables = BTreeMap<String, Vec<JsonValue>>;

/// Exact-match filter: a record matches when every listed field equals the
/// given JSON value. A missing field compares as `null`.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<(String, JsonValue)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq<V: Serialize>(mut self, field: &str, value: V) -> Self {
        let value = serde_json::to_value(value).unwrap_or(JsonValue::Null);
        self.filters.push((field.to_string(), value));
        self
    }

    pub fn eq_opt<V: Serialize>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn matches(&self, record: &JsonValue) -> bool {
        self.filters.iter().all(|(field, expected)| {
            record.get(field).unwrap_or(&JsonValue::Null) == expected
        })
    }
}

#[derive(Clone)]
pub struct JsonStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: Option<PathBuf>,
    tables: Mutex<Tables>,
}

impl JsonStore {
    /// Opens the store at `path`, creating an empty database file if none exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut tables: Tables = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Storage(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "creating new database file");
                Tables::new()
            }
            Err(e) => return Err(e.into()),
        };

        for table in Table::ALL {
            tables.entry(table.as_str().to_string()).or_default();
        }

        let store = Self {
            inner: Arc::new(Inner {
                path: Some(path),
                tables: Mutex::new(tables),
            }),
        };

        {
            let tables = store.inner.tables.lock().await;
            store.persist(&tables).await?;
        }

        Ok(store)
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        let tables = Table::ALL
            .iter()
            .map(|t| (t.as_str().to_string(), Vec::new()))
            .collect();
        Self {
            inner: Arc::new(Inner {
                path: None,
                tables: Mutex::new(tables),
            }),
        }
    }

    pub async fn find<T: DeserializeOwned>(&self, table: Table, query: &Query) -> Result<Vec<T>> {
        let tables = self.inner.tables.lock().await;
        rows(&tables, table)
            .iter()
            .filter(|record| query.matches(record))
            .map(|record| decode(table, record))
            .collect()
    }

    pub async fn find_one<T: DeserializeOwned>(&self, table: Table, query: &Query) -> Result<Option<T>> {
        let tables = self.inner.tables.lock().await;
        rows(&tables, table)
            .iter()
            .find(|record| query.matches(record))
            .map(|record| decode(table, record))
            .transpose()
    }

    pub async fn all<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>> {
        self.find(table, &Query::new()).await
    }

    pub async fn count(&self, table: Table, query: &Query) -> Result<usize> {
        let tables = self.inner.tables.lock().await;
        Ok(rows(&tables, table)
            .iter()
            .filter(|record| query.matches(record))
            .count())
    }

    pub async fn get<T: DeserializeOwned>(&self, table: Table, id: Uuid) -> Result<Option<T>> {
        self.find_one(table, &Query::new().eq("id", id)).await
    }

    /// Appends `record`, stamping `id`, `created_at` and `updated_at` when absent.
    pub async fn insert<N, T>(&self, table: Table, record: &N) -> Result<T>
    where
        N: Serialize,
        T: DeserializeOwned,
    {
        let value = serde_json::to_value(record)?;
        self.insert_with(table, move |_| Ok(value)).await
    }

    /// Like [`insert`](Self::insert) but fails with `Conflict` when an existing
    /// record already holds the same value in `field`.
    pub async fn insert_unique<N, T>(&self, table: Table, field: &str, record: &N) -> Result<T>
    where
        N: Serialize,
        T: DeserializeOwned,
    {
        let value = serde_json::to_value(record)?;
        let key = value.get(field).cloned().unwrap_or(JsonValue::Null);
        let field = field.to_string();
        self.insert_with(table, move |existing| {
            if existing
                .iter()
                .any(|r| r.get(&field).unwrap_or(&JsonValue::Null) == &key)
            {
                return Err(Error::Conflict(format!(
                    "A record with this {} already exists",
                    field
                )));
            }
            Ok(value)
        })
        .await
    }

    /// Builds the new record from the current table contents inside the write
    /// lock, so derived values (sequence numbers, uniqueness checks) cannot race.
    pub async fn insert_with<T, F>(&self, table: Table, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce(&[JsonValue]) -> Result<JsonValue>,
    {
        self.write(table, |records| {
            let mut value = build(records)?;
            stamp(&mut value)?;
            let decoded = decode(table, &value)?;
            records.push(value);
            Ok(decoded)
        })
        .await
    }

    /// Read-modify-write of one record by id. `updated_at` is refreshed.
    pub async fn update<T, F>(&self, table: Table, id: Uuid, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<()>,
    {
        let id_value = JsonValue::String(id.to_string());
        self.write(table, |records| {
            let slot = records
                .iter_mut()
                .find(|r| r.get("id") == Some(&id_value))
                .ok_or_else(|| Error::NotFound(format!("{} record {} not found", table, id)))?;

            let mut typed: T = decode(table, slot)?;
            f(&mut typed)?;

            let mut value = serde_json::to_value(&typed)?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("updated_at".into(), JsonValue::String(time::now_rfc3339()));
            }
            let decoded = decode(table, &value)?;
            *slot = value;
            Ok(decoded)
        })
        .await
    }

    pub async fn delete(&self, table: Table, id: Uuid) -> Result<bool> {
        let id_value = JsonValue::String(id.to_string());
        self.write(table, |records| {
            let before = records.len();
            records.retain(|r| r.get("id") != Some(&id_value));
            Ok(records.len() != before)
        })
        .await
    }

    /// Removes every record for which `predicate` holds; returns how many went.
    pub async fn delete_matching<T, P>(&self, table: Table, predicate: P) -> Result<usize>
    where
        T: DeserializeOwned,
        P: Fn(&T) -> bool,
    {
        self.write(table, |records| {
            let mut keep = Vec::with_capacity(records.len());
            let mut removed = 0;
            for record in records.drain(..) {
                let typed: T = decode(table, &record)?;
                if predicate(&typed) {
                    removed += 1;
                } else {
                    keep.push(record);
                }
            }
            *records = keep;
            Ok(removed)
        })
        .await
    }

    async fn write<R, F>(&self, table: Table, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<JsonValue>) -> Result<R>,
    {
        let mut tables = self.inner.tables.lock().await;
        let records = tables.entry(table.as_str().to_string()).or_default();
        let snapshot = records.clone();

        let outcome = match f(records) {
            Ok(value) => self.persist(&tables).await.map(|_| value),
            Err(e) => Err(e),
        };

        if outcome.is_err() {
            tables.insert(table.as_str().to_string(), snapshot);
        }
        outcome
    }

    async fn persist(&self, tables: &Tables) -> Result<()> {
        let Some(path) = self.inner.path.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::Storage(format!("Failed to create directory {}: {}", parent.display(), e))
                })?;
            }
        }

        let bytes = serde_json::to_vec_pretty(tables)?;
        let tmp_path = path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, bytes).await.map_err(|e| {
            Error::Storage(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
            Error::Storage(format!(
                "Failed to rename {} to {}: {}",
                tmp_path.display(),
                path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

fn rows<'a>(tables: &'a Tables, table: Table) -> &'a [JsonValue] {
    tables
        .get(table.as_str())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn decode<T: DeserializeOwned>(table: Table, record: &JsonValue) -> Result<T> {
    serde_json::from_value(record.clone())
        .map_err(|e| Error::Storage(format!("Malformed {} record: {}", table, e)))
}

fn stamp(value: &mut JsonValue) -> Result<()> {
    let obj = value
        .as_object_mut()
        .ok_or_else(|| Error::Internal("Only JSON objects can be stored".into()))?;

    let now = time::now_rfc3339();
    for (field, fresh) in [
        ("id", JsonValue::String(Uuid::new_v4().to_string())),
        ("created_at", JsonValue::String(now.clone())),
        ("updated_at", JsonValue::String(now)),
    ] {
        let missing = obj.get(field).map(JsonValue::is_null).unwrap_or(true);
        if missing {
            obj.insert(field.to_string(), fresh);
        }
    }
    Ok(())
}
