use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OpenFlags, ffi, params};
use serde_json::Value;

use crate::key::{DEFAULT_KEY, key_from_value};
use crate::timeline::{DEFAULT_MIX_NAME, Mix, OPENING_TRACK_TITLE, Track, generate_id, now_millis};

/// Blob key the mix list is stored under.
pub const MIXES_KEY: &str = "legato.mixes";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Key/value blob storage the mix list is persisted through.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub fn default_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("legato")
        .join("mixes.sqlite3")
}

/// `LEGATO_STORE_PATH` if set, else the per-user data directory.
pub fn resolve_store_path() -> PathBuf {
    match std::env::var("LEGATO_STORE_PATH") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => default_path(),
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let store_path = std::path::Path::new(path);
        if let Some(parent) = store_path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                rusqlite::Error::SqliteFailure(
                    ffi::Error::new(ffi::SQLITE_CANTOPEN),
                    Some(format!(
                        "failed to create parent directory {} for {}: {}",
                        parent.display(),
                        store_path.display(),
                        err
                    )),
                )
            })?;
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )?;
        migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self { conn })
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS blobs (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        PRAGMA user_version = 1;",
    )
}

impl BlobStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM blobs WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO blobs (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| {
        tracing::warn!("store: mutex poisoned, recovering");
        e.into_inner()
    })
}

/// In-process store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock_or_recover(&self.blobs).get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock_or_recover(&self.blobs).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load the mix list. Missing, unreadable, or corrupt storage yields an
/// empty list; individual malformed mixes are repaired, not dropped.
pub fn load_mixes(store: &impl BlobStore) -> Vec<Mix> {
    let raw = match store.get(MIXES_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("store: failed to read mixes: {e}");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries.iter().map(normalize_mix).collect(),
        Ok(other) => {
            tracing::warn!("store: expected an array of mixes, found {}", json_kind(&other));
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("store: stored mixes are not valid JSON: {e}");
            Vec::new()
        }
    }
}

pub fn save_mixes(store: &impl BlobStore, mixes: &[Mix]) -> Result<(), StoreError> {
    let json = serde_json::to_string(mixes)?;
    store.put(MIXES_KEY, &json)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn non_empty_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn normalize_track(value: &Value, index: usize, seen_ids: &mut HashSet<String>) -> Track {
    let id = match non_empty_str(value, "id") {
        Some(id) if !seen_ids.contains(id) => id.to_string(),
        _ => generate_id("track"),
    };
    seen_ids.insert(id.clone());

    let title = match non_empty_str(value, "title") {
        Some(title) => title.to_string(),
        None if index == 0 => OPENING_TRACK_TITLE.to_string(),
        None => String::new(),
    };

    // Older records kept tempo as a bare `bpm` number.
    let mut details = value
        .get("details")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if details.is_empty() {
        // `f64` display drops a zero fraction: 128.0 prints as "128".
        if let Some(bpm) = value.get("bpm").and_then(Value::as_f64) {
            details = format!("{bpm} BPM");
        }
    }

    Track {
        id,
        key: value.get("key").and_then(key_from_value).unwrap_or(DEFAULT_KEY),
        title,
        details,
    }
}

/// Repair one persisted mix of unknown shape.
pub fn normalize_mix(value: &Value) -> Mix {
    let mut seen_ids = HashSet::new();
    let tracks: Vec<Track> = value
        .get("tracks")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .enumerate()
                .map(|(index, entry)| normalize_track(entry, index, &mut seen_ids))
                .collect()
        })
        .unwrap_or_default();

    let stored_start = value.get("startKey").and_then(key_from_value);
    let seed_key = value
        .get("seedKey")
        .and_then(key_from_value)
        .or(stored_start)
        .unwrap_or(DEFAULT_KEY);
    let start_key = tracks.first().map(|t| t.key).unwrap_or(seed_key);

    Mix {
        id: non_empty_str(value, "id")
            .map(str::to_string)
            .unwrap_or_else(|| generate_id("mix")),
        name: non_empty_str(value, "name")
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_MIX_NAME.to_string()),
        start_key,
        seed_key,
        tracks,
        created_at: value
            .get("createdAt")
            .and_then(Value::as_i64)
            .filter(|ms| *ms > 0)
            .unwrap_or_else(now_millis),
    }
}
