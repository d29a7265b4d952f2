//! JSON document store for domain data
//!
//! Each domain document (`accounts`, `transactions`, ...) lives in its own
//! `<name>.json` file under the data directory. Multi-document writes go
//! through [`JsonFileStore::run_in_transaction`], which stages every
//! document to a temp file before renaming any of them into place.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{VaultError, VaultResult};

use super::file_io::{read_json_required, write_json, write_temp};
use super::snapshot::{Snapshot, SnapshotStore, DOCUMENTS};

/// Staged document writes, committed together
#[derive(Debug, Default)]
pub struct Transaction {
    staged: BTreeMap<String, Value>,
}

impl Transaction {
    /// Stage a full replacement of document `name`
    pub fn put(&mut self, name: &str, value: Value) -> VaultResult<()> {
        if !DOCUMENTS.contains(&name) {
            return Err(VaultError::validation(format!("Unknown document: {}", name)));
        }
        self.staged.insert(name.to_string(), value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// File-backed data store
#[derive(Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(data_dir, Arc::new(SystemClock))
    }

    pub fn with_clock(data_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            data_dir: data_dir.into(),
            clock,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of document `name`
    pub fn document_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    /// Create empty documents for any that are missing
    pub fn initialize(&self) -> VaultResult<()> {
        let missing: Vec<&str> = DOCUMENTS
            .iter()
            .copied()
            .filter(|name| !self.document_path(name).exists())
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        self.run_in_transaction(|tx| {
            for name in &missing {
                tx.put(name, Value::Array(Vec::new()))?;
            }
            Ok(())
        })
    }

    /// Load a document, treating a missing file as an empty list
    pub fn load_document(&self, name: &str) -> VaultResult<Value> {
        let path = self.document_path(name);
        if !path.exists() {
            return Ok(Value::Array(Vec::new()));
        }
        read_json_required(&path)
    }

    /// Number of records per document, for status output
    pub fn document_counts(&self) -> VaultResult<Vec<(String, usize)>> {
        DOCUMENTS
            .iter()
            .map(|name| {
                let count = match self.load_document(name)? {
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    _ => 1,
                };
                Ok((name.to_string(), count))
            })
            .collect()
    }

    /// Capture every document
    pub fn snapshot(&self) -> VaultResult<Snapshot> {
        let mut documents = BTreeMap::new();
        for name in DOCUMENTS {
            documents.insert(name.to_string(), self.load_document(name)?);
        }
        Ok(Snapshot::new(self.clock.now_ms(), documents))
    }

    /// Replace every document from a validated snapshot
    ///
    /// Documents absent from the snapshot are reset to an empty list.
    pub fn restore(&self, snapshot: Snapshot) -> VaultResult<()> {
        let mut documents = snapshot.documents;
        self.run_in_transaction(|tx| {
            for name in DOCUMENTS {
                let value = documents
                    .remove(name)
                    .unwrap_or_else(|| Value::Array(Vec::new()));
                tx.put(name, value)?;
            }
            Ok(())
        })
    }

    /// Run `block` against a fresh transaction and commit its writes together
    ///
    /// If `block` fails nothing is written. Staged documents are all written
    /// and synced as temp files before the first rename, and a failed rename
    /// restores every document already replaced.
    pub fn run_in_transaction<T, F>(&self, block: F) -> VaultResult<T>
    where
        F: FnOnce(&mut Transaction) -> VaultResult<T>,
    {
        let mut tx = Transaction::default();
        let value = block(&mut tx)?;
        self.commit(tx)?;
        Ok(value)
    }

    fn commit(&self, tx: Transaction) -> VaultResult<()> {
        let mut staged: Vec<StagedDocument> = Vec::with_capacity(tx.len());

        for (name, value) in &tx.staged {
            let target = self.document_path(name);
            match write_temp(&target, |file| write_json(file, value)) {
                Ok(temp) => staged.push(StagedDocument::new(temp, target)),
                Err(e) => return Err(roll_back(&staged, e)),
            }
        }

        for document in staged.iter_mut() {
            if let Err(e) = document.set_aside() {
                return Err(roll_back(&staged, e));
            }
        }

        for document in staged.iter_mut() {
            if let Err(e) = document.install() {
                return Err(roll_back(&staged, e));
            }
        }

        for document in &staged {
            document.discard_previous();
        }

        debug!(documents = staged.len(), "Committed transaction");
        Ok(())
    }
}

/// Suffix for the previous version of a document during a commit
const PREVIOUS_SUFFIX: &str = ".prev";

/// One document moving through a commit
///
/// The old file is renamed aside before any new file is installed, so every
/// step can be undone by renames alone.
struct StagedDocument {
    temp: PathBuf,
    target: PathBuf,
    previous: Option<PathBuf>,
    installed: bool,
}

impl StagedDocument {
    fn new(temp: PathBuf, target: PathBuf) -> Self {
        Self {
            temp,
            target,
            previous: None,
            installed: false,
        }
    }

    fn set_aside(&mut self) -> VaultResult<()> {
        if !self.target.is_file() {
            return Ok(());
        }
        let mut name = self.target.as_os_str().to_os_string();
        name.push(PREVIOUS_SUFFIX);
        let previous = PathBuf::from(name);

        fs::rename(&self.target, &previous).map_err(|e| {
            VaultError::Storage(format!(
                "Failed to set aside {}: {}",
                self.target.display(),
                e
            ))
        })?;
        self.previous = Some(previous);
        Ok(())
    }

    fn install(&mut self) -> VaultResult<()> {
        fs::rename(&self.temp, &self.target)
            .map_err(|e| VaultError::Storage(format!("Failed to rename temp file: {}", e)))?;
        self.installed = true;
        Ok(())
    }

    fn discard_previous(&self) {
        if let Some(previous) = &self.previous {
            let _ = fs::remove_file(previous);
        }
    }

    /// Put the target back the way it was before the commit started
    fn undo(&self) {
        if !self.installed {
            let _ = fs::remove_file(&self.temp);
        }

        let restored = match (&self.previous, self.installed) {
            (Some(previous), _) => fs::rename(previous, &self.target),
            (None, true) => fs::remove_file(&self.target),
            (None, false) => Ok(()),
        };

        if let Err(e) = restored {
            warn!(path = %self.target.display(), error = %e, "Failed to roll back document");
        }
    }
}

fn roll_back(staged: &[StagedDocument], cause: VaultError) -> VaultError {
    for document in staged.iter().rev() {
        document.undo();
    }
    warn!(error = %cause, "Transaction rolled back");
    cause
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn export_snapshot(&self) -> VaultResult<Vec<u8>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.snapshot()?.to_bytes()).await?
    }

    async fn import_snapshot(&self, bytes: &[u8]) -> VaultResult<()> {
        let snapshot = Snapshot::parse(bytes)?;
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.restore(snapshot)).await??;
        info!(data_dir = %self.data_dir.display(), "Imported snapshot");
        Ok(())
    }
}
