//! Backup orchestration
//!
//! [`BackupManager`] is the entry point for every backup flow. It resolves
//! the passphrase, pulls or pushes snapshots through the data store, and
//! runs encryption and file I/O on the blocking pool.
//!
//! Passphrases are taken by value. Whatever exit path an operation takes,
//! including a dropped future, the [`Passphrase`] is dropped with it and its
//! buffer is zeroed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::{Clock, MILLIS_PER_DAY};
use crate::crypto::{BackupCrypto, Passphrase, SecureBytes};
use crate::envelope;
use crate::error::{SecurityError, VaultError, VaultResult};
use crate::result::OpResult;
use crate::store::SnapshotStore;

use super::cloud::{select_latest, CloudBackupClient, CloudBackupEntry};
use super::passphrase::PassphraseStore;
use super::run_blocking;
use super::store::RetentionStore;

/// Default age after which local backups are pruned
pub const RETENTION_DAYS: i64 = 30;

/// Creates, restores, verifies and syncs encrypted backups
pub struct BackupManager {
    data: Arc<dyn SnapshotStore>,
    crypto: Arc<BackupCrypto>,
    retention: RetentionStore,
    passphrases: PassphraseStore,
    clock: Arc<dyn Clock>,
    retention_days: i64,
}

impl BackupManager {
    pub fn new(
        data: Arc<dyn SnapshotStore>,
        crypto: BackupCrypto,
        retention: RetentionStore,
        passphrases: PassphraseStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            data,
            crypto: Arc::new(crypto),
            retention,
            passphrases,
            clock,
            retention_days: RETENTION_DAYS,
        }
    }

    /// Override the retention window
    ///
    /// A window under one day would prune the backup that was just written.
    pub fn with_retention_days(mut self, days: i64) -> VaultResult<Self> {
        if days < 1 {
            return Err(VaultError::Config(format!(
                "Retention must be at least 1 day, got {}",
                days
            )));
        }
        self.retention_days = days;
        Ok(self)
    }

    pub fn retention(&self) -> &RetentionStore {
        &self.retention
    }

    pub fn passphrases(&self) -> &PassphraseStore {
        &self.passphrases
    }

    /// Export, encrypt and write a new backup, then prune expired ones
    pub async fn create_backup(&self, passphrase: Option<Passphrase>) -> OpResult<PathBuf> {
        self.try_create_backup(passphrase).await.into()
    }

    /// Decrypt `file` and replace the data store's state with it
    pub async fn restore_backup(&self, file: &Path, passphrase: Option<Passphrase>) -> OpResult<()> {
        self.try_restore_backup(file, passphrase).await.into()
    }

    /// Check that `file` decrypts under the passphrase without importing it
    ///
    /// Never succeeds with `false`: any failure is an error.
    pub async fn verify_backup(&self, file: &Path, passphrase: Option<Passphrase>) -> OpResult<bool> {
        self.try_verify_backup(file, passphrase).await.into()
    }

    /// Local backups, most recent first
    pub async fn list_backups(&self) -> OpResult<Vec<PathBuf>> {
        let retention = self.retention.clone();
        run_blocking(move || retention.list_backups()).await.into()
    }

    /// Delete local backups older than the retention window
    pub async fn prune_expired(&self) -> OpResult<Vec<PathBuf>> {
        let retention = self.retention.clone();
        let cutoff = self.retention_cutoff();
        run_blocking(move || retention.delete_backups_older_than(cutoff))
            .await
            .into()
    }

    /// Create a local backup and upload it
    ///
    /// A failed upload is reported as a network error; the local backup is
    /// kept either way.
    pub async fn upload_to_cloud(
        &self,
        client: &dyn CloudBackupClient,
        passphrase: Option<Passphrase>,
    ) -> OpResult<CloudBackupEntry> {
        let file = match self.create_backup(passphrase).await {
            OpResult::Success(file) => file,
            OpResult::Error(e) => return OpResult::Error(e),
            OpResult::Pending => return OpResult::Pending,
        };

        match client.upload(&file).await {
            OpResult::Error(e) => {
                warn!(path = %file.display(), error = %e, "Local backup created but upload failed");
                OpResult::Error(match e {
                    VaultError::Network(_) => e,
                    other => VaultError::network(format!("Upload failed: {}", other)),
                })
            }
            other => other,
        }
    }

    /// Download the newest remote backup and restore it
    pub async fn restore_latest_from_cloud(
        &self,
        client: &dyn CloudBackupClient,
        passphrase: Option<Passphrase>,
    ) -> OpResult<()> {
        let entries = match client.list().await {
            OpResult::Success(entries) => entries,
            OpResult::Error(e) => return OpResult::Error(e),
            OpResult::Pending => return OpResult::Pending,
        };

        let Some(entry) = select_latest(&entries) else {
            return OpResult::Error(VaultError::validation("No cloud backups found"));
        };

        let destination = match self.retention.create_backup_file(entry.modified_at) {
            Ok(path) => path,
            Err(e) => return OpResult::Error(e),
        };

        match client.download(&entry.id, &destination).await {
            OpResult::Success(file) => {
                info!(id = %entry.id, "Restoring latest cloud backup");
                self.restore_backup(&file, passphrase).await
            }
            OpResult::Error(e) => OpResult::Error(e),
            OpResult::Pending => OpResult::Pending,
        }
    }

    async fn try_create_backup(&self, passphrase: Option<Passphrase>) -> VaultResult<PathBuf> {
        let passphrase = self.resolve_passphrase(passphrase)?;
        let payload = SecureBytes::from(self.data.export_snapshot().await?);

        let crypto = self.crypto.clone();
        let retention = self.retention.clone();
        let clock = self.clock.clone();
        let retention_days = self.retention_days;

        let (path, pruned) = run_blocking(move || {
            let envelope = crypto.encrypt(&payload, &passphrase)?;
            let path = retention.create_backup_file(envelope.created_at())?;
            envelope::write_file(&path, &envelope)?;

            let cutoff = retention_cutoff(clock.now_ms(), retention_days);
            let pruned = retention.delete_backups_older_than(cutoff)?;
            Ok((path, pruned))
        })
        .await?;

        info!(path = %path.display(), pruned = pruned.len(), "Backup created");
        Ok(path)
    }

    async fn try_restore_backup(&self, file: &Path, passphrase: Option<Passphrase>) -> VaultResult<()> {
        let passphrase = self.resolve_passphrase(passphrase)?;
        let plaintext = self.decrypt_file(file, passphrase).await?;
        self.data.import_snapshot(&plaintext).await?;
        info!(path = %file.display(), "Backup restored");
        Ok(())
    }

    async fn try_verify_backup(&self, file: &Path, passphrase: Option<Passphrase>) -> VaultResult<bool> {
        let passphrase = self.resolve_passphrase(passphrase)?;
        self.decrypt_file(file, passphrase).await?;
        info!(path = %file.display(), "Backup verified");
        Ok(true)
    }

    async fn decrypt_file(&self, file: &Path, passphrase: Passphrase) -> VaultResult<SecureBytes> {
        let crypto = self.crypto.clone();
        let file = file.to_path_buf();
        run_blocking(move || {
            let envelope = envelope::read_file(&file)?;
            crypto.decrypt(&envelope, &passphrase)
        })
        .await
    }

    /// Explicit argument, then the stored passphrase, then an error
    fn resolve_passphrase(&self, explicit: Option<Passphrase>) -> VaultResult<Passphrase> {
        explicit
            .or_else(|| self.passphrases.load())
            .ok_or_else(|| SecurityError::PassphraseNotSet.into())
    }

    fn retention_cutoff(&self) -> i64 {
        retention_cutoff(self.clock.now_ms(), self.retention_days)
    }
}

fn retention_cutoff(now: i64, retention_days: i64) -> i64 {
    now.saturating_sub(retention_days.saturating_mul(MILLIS_PER_DAY))
}
