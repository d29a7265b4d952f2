//! Secure key/value storage
//!
//! Small secrets (the backup passphrase, the database key, rotation
//! timestamps) live behind [`SecureStorage`]. Confidentiality of the stored
//! values is the backing store's job; values are not encrypted again here.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::error::{VaultError, VaultResult};
use crate::store::file_io::{read_json, write_atomic, write_json};

/// String, boolean and integer values keyed by name
pub trait SecureStorage: Send + Sync {
    fn put_string(&self, key: &str, value: &str) -> VaultResult<()>;
    fn get_string(&self, key: &str) -> Option<String>;
    fn put_bool(&self, key: &str, value: bool) -> VaultResult<()>;
    fn get_bool(&self, key: &str, default: bool) -> bool;
    fn put_long(&self, key: &str, value: i64) -> VaultResult<()>;
    fn get_long(&self, key: &str, default: i64) -> i64;
    /// Write several values as one update; either all land or none do
    fn put_values(&self, entries: Vec<(String, Value)>) -> VaultResult<()>;
    fn remove(&self, key: &str) -> VaultResult<()>;
    fn clear(&self) -> VaultResult<()>;
}

type ValueMap = BTreeMap<String, Value>;

fn lock(values: &Mutex<ValueMap>) -> MutexGuard<'_, ValueMap> {
    values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Non-persistent storage
#[derive(Debug, Default)]
pub struct InMemorySecureStorage {
    values: Mutex<ValueMap>,
}

impl InMemorySecureStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&self, key: &str, value: Value) -> VaultResult<()> {
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }
}

impl SecureStorage for InMemorySecureStorage {
    fn put_string(&self, key: &str, value: &str) -> VaultResult<()> {
        self.put(key, Value::from(value))
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    fn put_bool(&self, key: &str, value: bool) -> VaultResult<()> {
        self.put(key, Value::from(value))
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    fn put_long(&self, key: &str, value: i64) -> VaultResult<()> {
        self.put(key, Value::from(value))
    }

    fn get_long(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
    }

    fn put_values(&self, entries: Vec<(String, Value)>) -> VaultResult<()> {
        lock(&self.values).extend(entries);
        Ok(())
    }

    fn remove(&self, key: &str) -> VaultResult<()> {
        lock(&self.values).remove(key);
        Ok(())
    }

    fn clear(&self) -> VaultResult<()> {
        lock(&self.values).clear();
        Ok(())
    }
}

/// Storage persisted as a JSON map with owner-only permissions
///
/// The whole map is rewritten atomically on every mutation. A failed write
/// leaves both the file and the in-memory view unchanged.
#[derive(Debug)]
pub struct FileSecureStorage {
    path: PathBuf,
    values: Mutex<ValueMap>,
}

impl FileSecureStorage {
    /// Open the store at `path`, starting empty if the file doesn't exist
    pub fn open(path: impl Into<PathBuf>) -> VaultResult<Self> {
        let path = path.into();
        let values: ValueMap = read_json(&path)
            .map_err(|e| VaultError::Storage(format!("Failed to load secure store: {}", e)))?;
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, mutate: impl FnOnce(&mut ValueMap)) -> VaultResult<()> {
        let mut values = lock(&self.values);
        let mut next = values.clone();
        mutate(&mut next);

        write_atomic(&self.path, |file| {
            restrict_permissions(file)?;
            write_json(file, &next)
        })?;

        *values = next;
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> VaultResult<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
        .map_err(|e| VaultError::Storage(format!("Failed to set file permissions: {}", e)))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) -> VaultResult<()> {
    Ok(())
}

impl SecureStorage for FileSecureStorage {
    fn put_string(&self, key: &str, value: &str) -> VaultResult<()> {
        self.update(|map| {
            map.insert(key.to_string(), Value::from(value));
        })
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    fn put_bool(&self, key: &str, value: bool) -> VaultResult<()> {
        self.update(|map| {
            map.insert(key.to_string(), Value::from(value));
        })
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    fn put_long(&self, key: &str, value: i64) -> VaultResult<()> {
        self.update(|map| {
            map.insert(key.to_string(), Value::from(value));
        })
    }

    fn get_long(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
    }

    fn put_values(&self, entries: Vec<(String, Value)>) -> VaultResult<()> {
        self.update(|map| map.extend(entries))
    }

    fn remove(&self, key: &str) -> VaultResult<()> {
        self.update(|map| {
            map.remove(key);
        })
    }

    fn clear(&self) -> VaultResult<()> {
        self.update(ValueMap::clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(storage: &dyn SecureStorage) {
        storage.put_string("name", "value").unwrap();
        storage.put_bool("flag", true).unwrap();
        storage.put_long("count", 42).unwrap();

        assert_eq!(storage.get_string("name"), Some("value".to_string()));
        assert!(storage.get_bool("flag", false));
        assert_eq!(storage.get_long("count", 0), 42);

        assert_eq!(storage.get_string("missing"), None);
        assert!(storage.get_bool("missing", true));
        assert_eq!(storage.get_long("missing", -1), -1);

        // Type mismatch falls back to the default
        assert_eq!(storage.get_long("name", 7), 7);

        storage
            .put_values(vec![
                ("count".to_string(), Value::from(43)),
                ("other".to_string(), Value::from("x")),
            ])
            .unwrap();
        assert_eq!(storage.get_long("count", 0), 43);
        assert_eq!(storage.get_string("other"), Some("x".to_string()));

        storage.remove("name").unwrap();
        assert_eq!(storage.get_string("name"), None);

        storage.clear().unwrap();
        assert_eq!(storage.get_long("count", 0), 0);
    }

    #[test]
    fn test_in_memory_storage() {
        exercise(&InMemorySecureStorage::new());
    }

    #[test]
    fn test_file_storage() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileSecureStorage::open(temp_dir.path().join("secure.json")).unwrap();
        exercise(&storage);
    }

    #[test]
    fn test_file_storage_persists_across_opens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secure.json");

        {
            let storage = FileSecureStorage::open(&path).unwrap();
            storage.put_string("backup_passphrase", "correct-horse").unwrap();
            storage.put_long("db_cipher_key_rotated_at", 1_000).unwrap();
        }

        let reopened = FileSecureStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get_string("backup_passphrase"),
            Some("correct-horse".to_string())
        );
        assert_eq!(reopened.get_long("db_cipher_key_rotated_at", 0), 1_000);
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secure.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(FileSecureStorage::open(&path).is_err());
    }

    #[test]
    fn test_file_storage_failed_batch_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secure.json");
        let storage = FileSecureStorage::open(&path).unwrap();
        storage.put_long("db_cipher_key_rotated_at", 1_000).unwrap();

        // A directory at the temp path makes the atomic write fail
        std::fs::create_dir(temp_dir.path().join("secure.json.tmp")).unwrap();
        let result = storage.put_values(vec![
            ("db_cipher_key".to_string(), Value::from("new")),
            ("db_cipher_key_rotated_at".to_string(), Value::from(2_000)),
        ]);

        assert!(result.is_err());
        assert_eq!(storage.get_string("db_cipher_key"), None);
        assert_eq!(storage.get_long("db_cipher_key_rotated_at", 0), 1_000);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secure.json");
        let storage = FileSecureStorage::open(&path).unwrap();
        storage.put_bool("flag", true).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
