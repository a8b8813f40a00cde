use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};

mod persistence;
mod schema;

pub use persistence::{Persistence, RuntimeContext, HEADLESS_ENV, STORAGE_KEY};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("serializing notes: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key-value substrate the note collection is cached in.
pub trait KeyValueStorage: Send {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct SqliteStorage {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl SqliteStorage {
    pub fn connect(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open(&*self.db_path)?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }
}

impl KeyValueStorage for SqliteStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                               updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            Ok(())
        })
    }
}

/// In-process substrate. Clones share contents, so a clone can stand in for
/// the same storage after a simulated restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.entries.lock().insert(key.to_string(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value);
        Ok(())
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<SqliteStorage, StorageError> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        paths.database_path.clone()
    } else {
        storage.database_path.clone()
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(&db_path)?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "opened key-value database");
    Ok(SqliteStorage {
        db_path: Arc::new(db_path),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<(), StorageError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_storage() -> anyhow::Result<(TempDir, SqliteStorage)> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        paths.ensure_directories()?;
        let storage = init(&paths, &StorageOptions::default())?;
        Ok((temp, storage))
    }

    #[test]
    fn missing_key_reads_as_none() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        assert_eq!(storage.read(STORAGE_KEY)?, None);
        Ok(())
    }

    #[test]
    fn write_replaces_existing_value() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.write(STORAGE_KEY, "[]")?;
        storage.write(STORAGE_KEY, r#"[{"id":"x"}]"#)?;
        assert_eq!(storage.read(STORAGE_KEY)?.as_deref(), Some(r#"[{"id":"x"}]"#));
        assert_eq!(storage.keys()?, vec![STORAGE_KEY.to_string()]);
        Ok(())
    }

    #[test]
    fn values_survive_reopening_the_database() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        {
            let storage = init(&paths, &StorageOptions::default())?;
            storage.write("other-app", "unrelated")?;
            storage.write(STORAGE_KEY, "[]")?;
        }
        let reopened = init(&paths, &StorageOptions::default())?;
        assert_eq!(reopened.read(STORAGE_KEY)?.as_deref(), Some("[]"));
        assert_eq!(reopened.read("other-app")?.as_deref(), Some("unrelated"));
        assert_eq!(reopened.database_path(), paths.database_path.as_path());
        Ok(())
    }

    #[test]
    fn connections_use_wal_journal() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let mode = storage.with_connection(|conn| {
            Ok(conn.pragma_query_value(None, "journal_mode", |row| row.get::<_, String>(0))?)
        })?;
        assert_eq!(mode.to_lowercase(), "wal");
        let foreign_keys = storage.with_connection(|conn| {
            Ok(conn.pragma_query_value(None, "foreign_keys", |row| row.get::<_, i64>(0))?)
        })?;
        assert_eq!(foreign_keys, 0);
        Ok(())
    }

    #[test]
    fn memory_storage_clones_share_entries() -> anyhow::Result<()> {
        let storage = MemoryStorage::new();
        let clone = storage.clone();
        storage.write("k", "v")?;
        assert_eq!(clone.read("k")?.as_deref(), Some("v"));
        Ok(())
    }
}
