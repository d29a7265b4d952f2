//! Backup directory management
//!
//! Backups are named `backup_<epoch_ms>.aabk`. The timestamp in the name is
//! authoritative for retention; files copied in from elsewhere without that
//! naming fall back to their modification time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::envelope::BACKUP_EXTENSION;
use crate::error::{VaultError, VaultResult};

/// Filename prefix for generated backups
pub const BACKUP_PREFIX: &str = "backup_";

/// Metadata about a backup
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// When the backup was created (filename first, then mtime)
    pub created_at: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Owns a backup directory: naming, listing, pruning
#[derive(Debug, Clone)]
pub struct RetentionStore {
    backup_dir: PathBuf,
}

impl RetentionStore {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Make sure the backup directory exists
    pub fn ensure_dir(&self) -> VaultResult<&Path> {
        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            VaultError::Io(format!("Failed to create backup directory: {}", e))
        })?;
        Ok(&self.backup_dir)
    }

    /// Path for a backup created at `created_at`; the directory is created
    pub fn create_backup_file(&self, created_at: i64) -> VaultResult<PathBuf> {
        let dir = self.ensure_dir()?;
        Ok(dir.join(backup_file_name(created_at)))
    }

    /// Backup files, most recently modified first
    ///
    /// Only `.aabk` files count; in-flight `.tmp` files are skipped.
    pub fn list_backups(&self) -> VaultResult<Vec<PathBuf>> {
        Ok(self
            .scan()?
            .into_iter()
            .map(|(path, _)| path)
            .collect())
    }

    /// Listing with metadata, in the same order as [`Self::list_backups`]
    pub fn backup_infos(&self) -> VaultResult<Vec<BackupInfo>> {
        self.scan()?
            .into_iter()
            .map(|(path, modified)| {
                let size_bytes = fs::metadata(&path)?.len();
                let created_at = resolve_timestamp(&path, modified);
                Ok(BackupInfo {
                    filename: file_name(&path),
                    created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_default(),
                    path,
                    size_bytes,
                })
            })
            .collect()
    }

    /// Most recent backup, if any
    pub fn latest_backup(&self) -> VaultResult<Option<PathBuf>> {
        Ok(self.list_backups()?.into_iter().next())
    }

    /// Delete every backup whose resolved timestamp is strictly before `cutoff`
    ///
    /// Returns the deleted paths. A file that disappears mid-pass is not an
    /// error.
    pub fn delete_backups_older_than(&self, cutoff: i64) -> VaultResult<Vec<PathBuf>> {
        let mut deleted = Vec::new();

        for (path, modified) in self.scan()? {
            if resolve_timestamp(&path, modified) >= cutoff {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Deleted expired backup");
                    deleted.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(VaultError::Io(format!(
                        "Failed to delete old backup {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        Ok(deleted)
    }

    /// Backup paths paired with their modification time, newest first
    fn scan(&self) -> VaultResult<Vec<(PathBuf, i64)>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.backup_dir).map_err(|e| {
            VaultError::Io(format!("Failed to read backup directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                VaultError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let path = entry.path();
            if !path.is_file() || !has_backup_extension(&path) {
                continue;
            }

            match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => backups.push((path, epoch_ms(modified))),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable backup"),
            }
        }

        backups.sort_by(|(a_path, a_time), (b_path, b_time)| {
            b_time.cmp(a_time).then_with(|| b_path.cmp(a_path))
        });

        Ok(backups)
    }
}

/// `backup_<epoch_ms>.aabk`
pub fn backup_file_name(created_at: i64) -> String {
    format!("{}{}.{}", BACKUP_PREFIX, created_at, BACKUP_EXTENSION)
}

/// Timestamp embedded in a backup filename, if it follows the convention
pub fn timestamp_from_name(path: &Path) -> Option<i64> {
    path.file_stem()?
        .to_str()?
        .strip_prefix(BACKUP_PREFIX)?
        .parse()
        .ok()
}

fn resolve_timestamp(path: &Path, modified: i64) -> i64 {
    timestamp_from_name(path).unwrap_or(modified)
}

fn has_backup_extension(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == BACKUP_EXTENSION)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn epoch_ms(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}
