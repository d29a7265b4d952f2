//! Domain snapshots and the data-store seam
//!
//! The backup pipeline treats snapshots as opaque bytes. Only the data store
//! knows how to produce and validate them.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{VaultError, VaultResult};

/// Snapshot layout version understood by this build
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Documents that make up the domain state
pub const DOCUMENTS: [&str; 4] = [
    "accounts",
    "transactions",
    "tags",
    "standing_instructions",
];

/// A data store that can export and atomically re-import its full state
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Serialize all domain state
    async fn export_snapshot(&self) -> VaultResult<Vec<u8>>;

    /// Replace all domain state with `bytes`, all or nothing
    ///
    /// Malformed or version-incompatible input is a validation error and
    /// leaves existing state untouched.
    async fn import_snapshot(&self, bytes: &[u8]) -> VaultResult<()>;
}

/// Self-describing serialization of every domain document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub exported_at: i64,
    pub documents: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn new(exported_at: i64, documents: BTreeMap<String, Value>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            exported_at,
            documents,
        }
    }

    /// Encode as JSON bytes
    pub fn to_bytes(&self) -> VaultResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode and validate snapshot bytes
    pub fn parse(bytes: &[u8]) -> VaultResult<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)
            .map_err(|e| VaultError::validation(format!("Malformed snapshot: {}", e)))?;

        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(VaultError::validation(format!(
                "Unsupported snapshot schema version: {}",
                snapshot.schema_version
            )));
        }

        if let Some(unknown) = snapshot
            .documents
            .keys()
            .find(|name| !DOCUMENTS.contains(&name.as_str()))
        {
            return Err(VaultError::validation(format!(
                "Unknown snapshot document: {}",
                unknown
            )));
        }

        Ok(snapshot)
    }
}

/// Snapshot store holding opaque bytes in memory
///
/// Useful for embedding and tests; it accepts any payload.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    state: Mutex<Vec<u8>>,
    imports: Mutex<usize>,
}

impl InMemorySnapshotStore {
    pub fn with_state(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            state: Mutex::new(bytes.into()),
            imports: Mutex::new(0),
        }
    }

    /// Current state bytes
    pub fn state(&self) -> Vec<u8> {
        lock(&self.state).clone()
    }

    pub fn set_state(&self, bytes: impl Into<Vec<u8>>) {
        *lock(&self.state) = bytes.into();
    }

    /// Number of completed imports
    pub fn import_count(&self) -> usize {
        *lock(&self.imports)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn export_snapshot(&self) -> VaultResult<Vec<u8>> {
        Ok(self.state())
    }

    async fn import_snapshot(&self, bytes: &[u8]) -> VaultResult<()> {
        *lock(&self.state) = bytes.to_vec();
        *lock(&self.imports) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_round_trip() {
        let mut documents = BTreeMap::new();
        documents.insert("accounts".to_string(), json!([{"id": 1, "name": "Checking"}]));
        let snapshot = Snapshot::new(1_000, documents);

        let parsed = Snapshot::parse(&snapshot.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = Snapshot::parse(b"{not json").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_parse_rejects_future_schema() {
        let bytes = br#"{"schema_version": 9, "exported_at": 0, "documents": {}}"#;
        let err = Snapshot::parse(bytes).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("schema version"));
    }

    #[test]
    fn test_parse_rejects_unknown_document() {
        let bytes = br#"{"schema_version": 1, "exported_at": 0, "documents": {"budgets": []}}"#;
        let err = Snapshot::parse(bytes).unwrap_err();
        assert!(err.to_string().contains("budgets"));
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemorySnapshotStore::with_state("before");
        assert_eq!(store.export_snapshot().await.unwrap(), b"before");

        store.import_snapshot(b"after").await.unwrap();
        assert_eq!(store.state(), b"after");
        assert_eq!(store.import_count(), 1);
    }
}
