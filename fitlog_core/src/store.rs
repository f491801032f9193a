//! Key-value persistence with file locking.
//!
//! Each key maps to one JSON document. The file-backed store keeps one
//! file per key and replaces it atomically on every write; there are no
//! partial updates. Values are wrapped in a small versioned envelope so
//! older layouts can be migrated on load.

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Key holding the serialized user profile
pub const PROFILE_KEY: &str = "profile";

/// Key holding the full log collection
pub const LOGS_KEY: &str = "logs";

/// Current envelope schema. Unversioned documents are schema 0.
pub const SCHEMA_VERSION: u64 = 1;

/// Minimal get/set/clear contract over string values
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Remove every key
    fn clear(&mut self) -> Result<()>;
}

// ============================================================================
// File-backed store
// ============================================================================

/// Store keeping `<dir>/<key>.json` files
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store rooted at `<data_dir>/store`
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("store"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::State(format!("invalid store key {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            tracing::debug!("No stored value for {:?}", key);
            return Ok(None);
        }

        let file = File::open(&path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        tracing::debug!("Read {} bytes for {:?}", contents.len(), key);
        Ok(Some(contents))
    }

    /// Atomically writes the value by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {:?} to {:?}", key, path);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }

        let mut count = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)?;
                count += 1;
            }
        }

        tracing::info!("Cleared {} stored keys from {:?}", count, self.dir);
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Store backed by a `HashMap`, for tests and embedding
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.values.clear();
        Ok(())
    }
}

// ============================================================================
// Versioned envelope
// ============================================================================

#[derive(Serialize)]
struct Envelope<'a, T> {
    schema: u64,
    data: &'a T,
}

/// Serialize `value` under `key` wrapped as `{"schema": N, "data": ...}`
pub fn save_value<S, T>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize,
{
    let contents = serde_json::to_string(&Envelope {
        schema: SCHEMA_VERSION,
        data: value,
    })?;
    store.set(key, &contents)
}

/// Load and unwrap the value under `key`, migrating older layouts
pub fn load_value<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let Some(contents) = store.get(key)? else {
        return Ok(None);
    };

    let raw: Value = serde_json::from_str(&contents)?;
    let data = unwrap_envelope(key, raw)?;
    Ok(Some(serde_json::from_value(data)?))
}

fn unwrap_envelope(key: &str, raw: Value) -> Result<Value> {
    let mut obj = match raw {
        Value::Object(obj)
            if obj.len() == 2 && obj.contains_key("schema") && obj.contains_key("data") =>
        {
            obj
        }
        other => {
            // Schema 0: the bare value as written by the original app.
            // Field aliases on the domain types handle the renames.
            tracing::info!("Migrating unversioned value for {:?}", key);
            return Ok(other);
        }
    };

    let schema = obj
        .get("schema")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::State(format!("{:?} has a malformed schema tag", key)))?;

    if schema > SCHEMA_VERSION {
        return Err(Error::State(format!(
            "{:?} was written with schema {} but this build reads up to {}",
            key, schema, SCHEMA_VERSION
        )));
    }

    Ok(obj.remove("data").unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_file_store_get_set() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(temp_dir.path());

        assert_eq!(store.get("profile").unwrap(), None);

        store.set("profile", "{\"a\":1}").unwrap();
        assert_eq!(store.get("profile").unwrap().as_deref(), Some("{\"a\":1}"));

        store.set("profile", "{\"a\":2}").unwrap();
        assert_eq!(store.get("profile").unwrap().as_deref(), Some("{\"a\":2}"));
    }

    #[test]
    fn test_file_store_atomic_write_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(temp_dir.path());
        store.set("logs", "[]").unwrap();

        let names: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["logs.json".to_string()]);
    }

    #[test]
    fn test_file_store_clear() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(temp_dir.path());
        store.set("profile", "{}").unwrap();
        store.set("logs", "[]").unwrap();

        store.clear().unwrap();

        assert_eq!(store.get("profile").unwrap(), None);
        assert_eq!(store.get("logs").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(temp_dir.path());
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_envelope_roundtrip() {
        let mut store = MemoryStore::new();
        let sample = Sample {
            name: "x".into(),
            count: 3,
        };
        save_value(&mut store, "sample", &sample).unwrap();

        let raw: Value = serde_json::from_str(&store.get("sample").unwrap().unwrap()).unwrap();
        assert_eq!(raw["schema"], 1);
        assert_eq!(raw["data"]["count"], 3);

        let loaded: Sample = load_value(&store, "sample").unwrap().unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_unversioned_value_is_migrated() {
        let mut store = MemoryStore::new();
        store.set("sample", r#"{"name":"legacy","count":7}"#).unwrap();

        let loaded: Sample = load_value(&store, "sample").unwrap().unwrap();
        assert_eq!(loaded.count, 7);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut store = MemoryStore::new();
        store
            .set("sample", r#"{"schema":99,"data":{"name":"future","count":1}}"#)
            .unwrap();

        let result: Result<Option<Sample>> = load_value(&store, "sample");
        assert!(matches!(result, Err(Error::State(_))));
    }

    #[test]
    fn test_missing_key_loads_none() {
        let store = MemoryStore::new();
        let loaded: Option<Sample> = load_value(&store, "nothing").unwrap();
        assert!(loaded.is_none());
    }
}
