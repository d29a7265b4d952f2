//! Remote backup storage
//!
//! The backup manager only needs three calls from a remote store: upload a
//! file, list what is there, and download one entry by id. Results are
//! [`OpResult`]s so a remote that is still syncing can answer `Pending`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::envelope::BACKUP_EXTENSION;
use crate::error::{VaultError, VaultResult};
use crate::result::OpResult;
use crate::store::file_io::write_atomic;

use super::run_blocking;

/// A backup file held by a remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudBackupEntry {
    pub id: String,
    pub name: String,
    /// Remote modification time in epoch milliseconds
    pub modified_at: i64,
}

/// Opaque remote store for backup files
#[async_trait]
pub trait CloudBackupClient: Send + Sync {
    async fn upload(&self, file: &Path) -> OpResult<CloudBackupEntry>;

    async fn list(&self) -> OpResult<Vec<CloudBackupEntry>>;

    /// Download entry `id` to `destination`, returning the written path
    async fn download(&self, id: &str, destination: &Path) -> OpResult<PathBuf>;
}

/// Most recently modified entry; ties go to the greatest id
pub fn select_latest(entries: &[CloudBackupEntry]) -> Option<&CloudBackupEntry> {
    entries.iter().max_by(|a, b| {
        a.modified_at
            .cmp(&b.modified_at)
            .then_with(|| a.id.cmp(&b.id))
    })
}

/// A remote backed by a directory, such as a synced drive mount
///
/// Entry ids are file names within the directory.
#[derive(Debug, Clone)]
pub struct DirectoryCloudClient {
    remote_dir: PathBuf,
}

impl DirectoryCloudClient {
    pub fn new(remote_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote_dir: remote_dir.into(),
        }
    }

    pub fn remote_dir(&self) -> &Path {
        &self.remote_dir
    }

    fn ensure_reachable(&self) -> VaultResult<()> {
        if self.remote_dir.is_dir() {
            Ok(())
        } else {
            Err(VaultError::network(format!(
                "Remote directory {} is not available",
                self.remote_dir.display()
            )))
        }
    }

    fn upload_blocking(&self, file: &Path) -> VaultResult<CloudBackupEntry> {
        self.ensure_reachable()?;
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| VaultError::validation(format!("Not a file: {}", file.display())))?;

        let target = self.remote_dir.join(&name);
        copy_atomic(file, &target)
            .map_err(|e| VaultError::network(format!("Upload of {} failed: {}", name, e)))?;

        let entry = entry_for(&target)?;
        info!(id = %entry.id, remote = %self.remote_dir.display(), "Uploaded backup");
        Ok(entry)
    }

    fn list_blocking(&self) -> VaultResult<Vec<CloudBackupEntry>> {
        self.ensure_reachable()?;
        let mut entries = Vec::new();

        for dir_entry in fs::read_dir(&self.remote_dir)
            .map_err(|e| VaultError::network(format!("Failed to list remote backups: {}", e)))?
        {
            let path = dir_entry
                .map_err(|e| VaultError::network(format!("Failed to list remote backups: {}", e)))?
                .path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == BACKUP_EXTENSION) {
                entries.push(entry_for(&path)?);
            }
        }

        Ok(entries)
    }

    fn download_blocking(&self, id: &str, destination: &Path) -> VaultResult<PathBuf> {
        self.ensure_reachable()?;
        if id.is_empty() || Path::new(id).file_name().map_or(true, |n| n != id) {
            return Err(VaultError::validation(format!("Invalid remote backup id: {}", id)));
        }

        let source = self.remote_dir.join(id);
        if !source.is_file() {
            return Err(VaultError::network(format!("Remote backup not found: {}", id)));
        }

        copy_atomic(&source, destination)
            .map_err(|e| VaultError::network(format!("Download of {} failed: {}", id, e)))?;

        info!(id, destination = %destination.display(), "Downloaded backup");
        Ok(destination.to_path_buf())
    }
}

#[async_trait]
impl CloudBackupClient for DirectoryCloudClient {
    async fn upload(&self, file: &Path) -> OpResult<CloudBackupEntry> {
        let client = self.clone();
        let file = file.to_path_buf();
        run_blocking(move || client.upload_blocking(&file)).await.into()
    }

    async fn list(&self) -> OpResult<Vec<CloudBackupEntry>> {
        let client = self.clone();
        run_blocking(move || client.list_blocking()).await.into()
    }

    async fn download(&self, id: &str, destination: &Path) -> OpResult<PathBuf> {
        let client = self.clone();
        let id = id.to_string();
        let destination = destination.to_path_buf();
        run_blocking(move || client.download_blocking(&id, &destination))
            .await
            .into()
    }
}

fn copy_atomic(source: &Path, target: &Path) -> VaultResult<()> {
    let mut input = File::open(source)?;
    write_atomic(target, |out| {
        io::copy(&mut input, out)?;
        Ok(())
    })
}

fn entry_for(path: &Path) -> VaultResult<CloudBackupEntry> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| VaultError::network(format!("Failed to stat {}: {}", name, e)))?;

    Ok(CloudBackupEntry {
        id: name.clone(),
        name,
        modified_at: DateTime::<Utc>::from(modified).timestamp_millis(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, modified_at: i64) -> CloudBackupEntry {
        CloudBackupEntry {
            id: id.to_string(),
            name: id.to_string(),
            modified_at,
        }
    }

    #[test]
    fn test_select_latest_by_modified_time() {
        let entries = vec![entry("a", 10), entry("b", 30), entry("c", 20)];
        assert_eq!(select_latest(&entries).unwrap().id, "b");
    }

    #[test]
    fn test_select_latest_tie_breaks_on_greatest_id() {
        let entries = vec![entry("b", 30), entry("c", 30), entry("a", 30)];
        assert_eq!(select_latest(&entries).unwrap().id, "c");

        let reversed: Vec<_> = entries.into_iter().rev().collect();
        assert_eq!(select_latest(&reversed).unwrap().id, "c");
    }

    #[test]
    fn test_select_latest_empty() {
        assert!(select_latest(&[]).is_none());
    }

    #[tokio::test]
    async fn test_directory_client_round_trip() {
        let temp = TempDir::new().unwrap();
        let remote = temp.path().join("remote");
        fs::create_dir(&remote).unwrap();
        let local = temp.path().join("backup_5.aabk");
        fs::write(&local, b"payload").unwrap();
        let client = DirectoryCloudClient::new(&remote);

        let uploaded = client.upload(&local).await.into_result().unwrap().unwrap();
        assert_eq!(uploaded.id, "backup_5.aabk");

        let listed = client.list().await.into_result().unwrap().unwrap();
        assert_eq!(listed, vec![uploaded.clone()]);

        let destination = temp.path().join("restored.aabk");
        let path = client
            .download(&uploaded.id, &destination)
            .await
            .into_result()
            .unwrap()
            .unwrap();
        assert_eq!(fs::read(path).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_directory_client_missing_remote_is_network_error() {
        let temp = TempDir::new().unwrap();
        let client = DirectoryCloudClient::new(temp.path().join("unmounted"));

        let err = client.list().await.into_result().unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Network);
    }

    #[tokio::test]
    async fn test_directory_client_rejects_path_ids() {
        let temp = TempDir::new().unwrap();
        let client = DirectoryCloudClient::new(temp.path());

        let result = client
            .download("../secret.aabk", &temp.path().join("out.aabk"))
            .await;
        assert!(result.into_result().unwrap_err().is_validation());
    }
}
