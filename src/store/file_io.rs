//! File I/O utilities with atomic writes
//!
//! Every write lands in a sibling `.tmp` file first and is renamed over the
//! target only after it has been flushed and synced, so readers see either
//! the old content or the new content, never a mix.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{VaultError, VaultResult};

/// Suffix appended to in-flight writes
pub const TEMP_SUFFIX: &str = ".tmp";

/// Sibling temp path for `path` (`backup_1.aabk` -> `backup_1.aabk.tmp`)
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Write a file atomically (write to temp, then rename)
///
/// `write` receives the open temp file. If it fails, the temp file is
/// removed and the target is left untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> VaultResult<()>
where
    F: FnOnce(&mut File) -> VaultResult<()>,
{
    let temp_path = write_temp(path, write)?;
    commit_temp(&temp_path, path)
}

/// Write to the temp sibling of `path` and sync it, without renaming
///
/// Used by multi-file commits that must stage everything before any rename.
pub fn write_temp<F>(path: &Path, write: F) -> VaultResult<PathBuf>
where
    F: FnOnce(&mut File) -> VaultResult<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            VaultError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path);
    let mut file = File::create(&temp_path)
        .map_err(|e| VaultError::Storage(format!("Failed to create temp file: {}", e)))?;

    let written = write(&mut file).and_then(|()| {
        file.sync_all()
            .map_err(|e| VaultError::Storage(format!("Failed to sync data: {}", e)))
    });

    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(temp_path)
}

/// Rename a synced temp file over its target
pub fn commit_temp(temp_path: &Path, path: &Path) -> VaultResult<()> {
    fs::rename(temp_path, path).map_err(|e| {
        let _ = fs::remove_file(temp_path);
        VaultError::Storage(format!("Failed to rename temp file: {}", e))
    })
}

/// Write JSON to a file atomically
pub fn write_json_atomic<T, P>(path: P, data: &T) -> VaultResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    write_atomic(path.as_ref(), |file| write_json(file, data))
}

/// Serialize pretty JSON into an open file
pub fn write_json<T: Serialize>(file: &mut File, data: &T) -> VaultResult<()> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| VaultError::Storage(format!("Failed to serialize data: {}", e)))?;
    writer
        .flush()
        .map_err(|e| VaultError::Storage(format!("Failed to flush data: {}", e)))
}

/// Read JSON from a file, returning a default value if file doesn't exist
pub fn read_json<T, P>(path: P) -> VaultResult<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    read_json_required(path)
}

/// Read JSON from a file, returning an error if file doesn't exist
pub fn read_json_required<T, P>(path: P) -> VaultResult<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Err(VaultError::Storage(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)
        .map_err(|e| VaultError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| VaultError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}
